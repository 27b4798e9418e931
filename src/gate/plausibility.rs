//! Plausibility checks applied to extracted fields.
//!
//! Each check either passes or yields one human-readable issue string.
//! Issue strings end up in the review queue UI and the audit trail, so
//! they name the field and the problem, not internal details.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::ExtractedFields;

/// German street address: street name, house number, 5-digit postal
/// code, city. Commas between parts are optional.
fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\S.*\s\d+\w?\s*,?\s+\d{5}\s+\S.*$").expect("valid address regex")
    })
}

/// ISO-8601 calendar date, the only date shape the intake forms emit.
fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlausibilityCheck {
    /// The citizen's full name must be present.
    RequireFullName,
    /// A move-in date must be present and look like a calendar date.
    RequireMoveInDate,
    /// The new address must be present and match the expected shape.
    NewAddressFormat,
    /// The old address, when present, must match the expected shape.
    OldAddressFormat,
}

impl PlausibilityCheck {
    /// Checks enabled by default.
    pub fn standard() -> Vec<PlausibilityCheck> {
        vec![
            PlausibilityCheck::RequireFullName,
            PlausibilityCheck::RequireMoveInDate,
            PlausibilityCheck::NewAddressFormat,
            PlausibilityCheck::OldAddressFormat,
        ]
    }

    /// `None` when the check passes, otherwise the issue to report.
    pub fn apply(&self, fields: &ExtractedFields) -> Option<String> {
        match self {
            PlausibilityCheck::RequireFullName => match &fields.full_name {
                Some(name) if !name.trim().is_empty() => None,
                _ => Some("full name missing".into()),
            },
            PlausibilityCheck::RequireMoveInDate => match &fields.move_in_date {
                None => Some("move-in date missing".into()),
                Some(date) if !date_pattern().is_match(date.trim()) => {
                    Some(format!("move-in date ambiguous: \"{date}\""))
                }
                Some(_) => None,
            },
            PlausibilityCheck::NewAddressFormat => match &fields.new_address {
                None => Some("new address missing".into()),
                Some(addr) if !address_pattern().is_match(addr.trim()) => {
                    Some(format!("new address format ambiguous: \"{addr}\""))
                }
                Some(_) => None,
            },
            // The old address is optional on some forms, so absence is
            // fine, only a malformed value is flagged.
            PlausibilityCheck::OldAddressFormat => match &fields.old_address {
                Some(addr) if !address_pattern().is_match(addr.trim()) => {
                    Some(format!("old address format ambiguous: \"{addr}\""))
                }
                _ => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields_with_address(addr: &str) -> ExtractedFields {
        ExtractedFields {
            new_address: Some(addr.into()),
            ..Default::default()
        }
    }

    #[test]
    fn well_formed_addresses_pass() {
        for addr in [
            "Musterstraße 1, 12345 Berlin",
            "Hauptstr. 17a, 80331 München",
            "Am Ring 3 04109 Leipzig",
        ] {
            assert_eq!(
                PlausibilityCheck::NewAddressFormat.apply(&fields_with_address(addr)),
                None,
                "{addr} should pass"
            );
        }
    }

    #[test]
    fn malformed_addresses_are_flagged() {
        for addr in ["Berlin", "Musterstraße 1", "12345", "somewhere nice"] {
            let issue = PlausibilityCheck::NewAddressFormat
                .apply(&fields_with_address(addr))
                .unwrap();
            assert!(issue.contains("ambiguous"), "{addr}: {issue}");
        }
    }

    #[test]
    fn missing_new_address_is_flagged() {
        let issue = PlausibilityCheck::NewAddressFormat
            .apply(&ExtractedFields::default())
            .unwrap();
        assert_eq!(issue, "new address missing");
    }

    #[test]
    fn missing_old_address_is_tolerated() {
        assert_eq!(
            PlausibilityCheck::OldAddressFormat.apply(&ExtractedFields::default()),
            None
        );
    }

    #[test]
    fn blank_name_is_flagged() {
        let fields = ExtractedFields {
            full_name: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(
            PlausibilityCheck::RequireFullName.apply(&fields),
            Some("full name missing".into())
        );
    }

    #[test]
    fn date_shape_is_enforced() {
        let mut fields = ExtractedFields {
            move_in_date: Some("2026-09-01".into()),
            ..Default::default()
        };
        assert_eq!(PlausibilityCheck::RequireMoveInDate.apply(&fields), None);

        fields.move_in_date = Some("1. September 2026".into());
        assert!(PlausibilityCheck::RequireMoveInDate
            .apply(&fields)
            .unwrap()
            .contains("ambiguous"));
    }
}
