//! Phone number canonicalization.
//!
//! Contacts and message handles spell numbers differently (`(555) 123-4567`,
//! `+15551234567`, `555.123.4567`). Both sides are reduced to a digit string
//! before they are compared, and bare 10 digit numbers get the US country code.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Digits-only phone key used to join handles against contacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NormalizedPhone(String);

impl NormalizedPhone {
    /// Borrow the digit string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the raw input held no digits at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedPhone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedPhone {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Strip everything but ASCII digits; prefix "1" when exactly 10 digits remain.
///
/// Never fails. Emails and names normalize to an empty key.
#[must_use]
pub fn normalize(raw: &str) -> NormalizedPhone {
    let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 10 {
        digits.insert(0, '1');
    }
    NormalizedPhone(digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_formatted_us_number() {
        assert_eq!(normalize("(555) 123-4567").as_str(), "15551234567");
    }

    #[test]
    fn test_international_prefix() {
        assert_eq!(normalize("+1 555 123 4567").as_str(), "15551234567");
    }

    #[test]
    fn test_short_code_untouched() {
        assert_eq!(normalize("911").as_str(), "911");
    }

    #[test]
    fn test_non_phone_handles() {
        assert!(normalize("").is_empty());
        assert!(normalize("alice@example.com").is_empty());
        assert!(normalize("Me").is_empty());
    }

    #[test]
    fn test_foreign_number_kept() {
        assert_eq!(normalize("+44 20 7946 0958").as_str(), "442079460958");
    }

    proptest! {
        #[test]
        fn normalized_is_digits_only(raw in ".*") {
            let key = normalize(&raw);
            prop_assert!(key.as_str().chars().all(|c| c.is_ascii_digit()));
        }

        #[test]
        fn normalize_is_idempotent(raw in ".*") {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(once.as_str()), once);
        }
    }
}
