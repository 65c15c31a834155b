use std::fmt;

/// Personal access token for the GitHub API.
///
/// Wrapped so it never ends up in logs through `Debug`.
#[derive(Clone)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads the token from `GITHUB_TOKEN`, then `ACCESS_TOKEN`.
    pub fn from_env() -> Option<Self> {
        ["GITHUB_TOKEN", "ACCESS_TOKEN"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
            .map(Self::from)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::from("ghp_secret");
        assert_eq!(format!("{token:?}"), "Token(***)");
        assert_eq!(token.as_str(), "ghp_secret");
    }

    #[test]
    fn test_token_is_trimmed() {
        let token = Token::from(String::from("  ghp_abc\n"));
        assert_eq!(token.as_str(), "ghp_abc");
    }
}
