//! The conversation layer: session values, the dispatch convention
//! and turn processing.

mod agent;
mod dispatch;
mod models;

use std::sync::LazyLock;

use regex::Regex;

pub use agent::{Agent, AgentSettings};
pub use dispatch::*;
pub use models::*;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.-]+@[\w.-]+\.\w{2,}$").expect("Invalid regex"));

pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("me@example.com"));
        assert!(validate_email(" first.last@sub.example.io "));
        assert!(!validate_email("Bob"));
        assert!(!validate_email("me@localhost"));
        assert!(!validate_email("me@example.c"));
    }
}
