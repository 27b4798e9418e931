use serde::{Deserialize, Serialize};

/// Structured fields produced by document extraction.
///
/// All fields are optional: extraction may only partially succeed, and a
/// partial record is exactly what gets parked for human review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub old_address: Option<String>,
    pub new_address: Option<String>,
    pub move_in_date: Option<String>,
    pub landlord_name: Option<String>,
}

impl ExtractedFields {
    /// Overlay `other` on top of `self`: any field set in `other` wins.
    ///
    /// Used when a human correction takes precedence over extracted values.
    pub fn merged_with(&self, other: &ExtractedFields) -> ExtractedFields {
        ExtractedFields {
            full_name: other.full_name.clone().or_else(|| self.full_name.clone()),
            date_of_birth: other
                .date_of_birth
                .clone()
                .or_else(|| self.date_of_birth.clone()),
            old_address: other
                .old_address
                .clone()
                .or_else(|| self.old_address.clone()),
            new_address: other
                .new_address
                .clone()
                .or_else(|| self.new_address.clone()),
            move_in_date: other
                .move_in_date
                .clone()
                .or_else(|| self.move_in_date.clone()),
            landlord_name: other
                .landlord_name
                .clone()
                .or_else(|| self.landlord_name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_override_fields() {
        let extracted = ExtractedFields {
            full_name: Some("Erika Mustermann".into()),
            new_address: Some("Hauptstr 5 Berlin".into()),
            ..Default::default()
        };
        let correction = ExtractedFields {
            new_address: Some("Musterstraße 1, 12345 Berlin".into()),
            ..Default::default()
        };

        let merged = extracted.merged_with(&correction);
        assert_eq!(merged.full_name.as_deref(), Some("Erika Mustermann"));
        assert_eq!(
            merged.new_address.as_deref(),
            Some("Musterstraße 1, 12345 Berlin")
        );
    }

    #[test]
    fn merge_with_empty_override_is_identity() {
        let extracted = ExtractedFields {
            full_name: Some("Max Mustermann".into()),
            move_in_date: Some("2026-09-01".into()),
            ..Default::default()
        };
        let merged = extracted.merged_with(&ExtractedFields::default());
        assert_eq!(merged, extracted);
    }
}
