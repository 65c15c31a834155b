use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color as TableColor, ContentArrangement, Table};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn count_cell(value: u64) -> Cell {
    Cell::new(super::styling::grouped(value)).set_alignment(CellAlignment::Right)
}

/// A colored block followed by the hex code, e.g. `■ #dea584`.
pub fn swatch_cell(hex: &str) -> Cell {
    let cell = Cell::new(format!("■ {hex}"));
    match parse_hex_color(hex) {
        Some((r, g, b)) => cell.fg(TableColor::Rgb { r, g, b }),
        None => cell,
    }
}

/// Share of the total; large shares stand out.
pub fn percentage_cell(percentage: f64) -> Cell {
    let text = format!("{percentage:.2}%");
    let cell = Cell::new(text).set_alignment(CellAlignment::Right);
    if percentage >= 25.0 {
        cell.fg(TableColor::Green)
    } else if percentage >= 5.0 {
        cell.fg(TableColor::Yellow)
    } else {
        cell
    }
}

fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#dea584"), Some((0xde, 0xa5, 0x84)));
        assert_eq!(parse_hex_color("#00ADD8"), Some((0x00, 0xad, 0xd8)));
    }

    #[test]
    fn test_parse_hex_color_rejects_malformed() {
        assert_eq!(parse_hex_color("dea584"), None);
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
        assert_eq!(parse_hex_color("#ééé"), None);
    }
}
