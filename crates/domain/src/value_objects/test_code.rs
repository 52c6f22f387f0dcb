//! Probe token embedded in the test email
//!
//! The code is a short uppercase hex token that the engine searches for in
//! each monitored mailbox. It has to survive subject lines, plain-text
//! bodies, and provider-side text indexing, which is why it stays strictly
//! alphanumeric.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

/// Length of a generated test code in hex characters
const CODE_LEN: usize = 12;

/// The unique probe token for one deliverability test
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestCode(String);

impl TestCode {
    /// Generate a new random test code (12 uppercase hex characters)
    #[must_use]
    pub fn generate() -> Self {
        let bytes = Uuid::new_v4().into_bytes();
        let mut code = String::with_capacity(CODE_LEN);
        for byte in &bytes[..CODE_LEN / 2] {
            code.push_str(&format!("{byte:02X}"));
        }
        Self(code)
    }

    /// Parse a test code from a string, normalizing to uppercase
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not exactly 12 hex characters.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let value = s.trim().to_uppercase();
        if value.len() != CODE_LEN || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidTestCode(s.to_string()));
        }
        Ok(Self(value))
    }

    /// Get the code as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_has_expected_shape() {
        let code = TestCode::generate();
        assert_eq!(code.as_str().len(), 12);
        assert!(code.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(code.as_str(), code.as_str().to_uppercase());
    }

    #[test]
    fn generated_codes_are_unique() {
        let a = TestCode::generate();
        let b = TestCode::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn parse_normalizes_to_uppercase() {
        let code = TestCode::parse("a1b2c3d4e5f6").unwrap();
        assert_eq!(code.as_str(), "A1B2C3D4E5F6");
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(TestCode::parse("ABC123").is_err());
        assert!(TestCode::parse("A1B2C3D4E5F6A1").is_err());
    }

    #[test]
    fn parse_rejects_non_hex() {
        assert!(TestCode::parse("G1B2C3D4E5F6").is_err());
        assert!(TestCode::parse("A1B2 C3D4E5F").is_err());
    }

    #[test]
    fn roundtrips_through_display() {
        let code = TestCode::generate();
        let parsed = TestCode::parse(&code.to_string()).unwrap();
        assert_eq!(code, parsed);
    }
}
