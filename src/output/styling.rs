use console::{style, StyledObject};

/// Styling helpers for terminal output
pub fn heading(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().underlined()
}

pub fn label(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn pending(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn done(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn accent(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn brand(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// Formats a count with thousands separators, e.g. `12,345`.
pub fn grouped(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
