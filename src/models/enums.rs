use crate::db::DatabaseError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serde goes through the canonical strings, so JSON and the database
/// agree on the representation.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(
                deserializer: D,
            ) -> Result<Self, D::Error> {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

str_enum!(CaseStatus {
    Received => "RECEIVED",
    Queued => "QUEUED",
    AutoProcessing => "AUTO_PROCESSING",
    WaitingForHuman => "WAITING_FOR_HUMAN",
    Closed => "CLOSED",
    Error => "ERROR",
});

str_enum!(DocumentKind {
    LandlordConfirmation => "landlord_confirmation",
    RegistrationForm => "registration_form",
});

impl CaseStatus {
    /// Whether the lifecycle graph permits moving from `self` to `next`.
    ///
    /// `AutoProcessing -> Queued` is the stale-result path: an extraction
    /// superseded by a newer document upload is discarded and the case
    /// returns to the queue.
    pub fn can_transition_to(&self, next: CaseStatus) -> bool {
        use CaseStatus::*;
        matches!(
            (self, next),
            (Received, Queued)
                | (Queued, AutoProcessing)
                | (AutoProcessing, Closed)
                | (AutoProcessing, WaitingForHuman)
                | (AutoProcessing, Error)
                | (AutoProcessing, Queued)
                | (WaitingForHuman, AutoProcessing)
        )
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseStatus::Closed | CaseStatus::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            CaseStatus::Received,
            CaseStatus::Queued,
            CaseStatus::AutoProcessing,
            CaseStatus::WaitingForHuman,
            CaseStatus::Closed,
            CaseStatus::Error,
        ] {
            assert_eq!(CaseStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_rejected() {
        assert!(CaseStatus::from_str("PENDING").is_err());
    }

    #[test]
    fn legal_edges_only() {
        use CaseStatus::*;
        assert!(Received.can_transition_to(Queued));
        assert!(Queued.can_transition_to(AutoProcessing));
        assert!(AutoProcessing.can_transition_to(Closed));
        assert!(AutoProcessing.can_transition_to(WaitingForHuman));
        assert!(AutoProcessing.can_transition_to(Error));
        assert!(AutoProcessing.can_transition_to(Queued));
        assert!(WaitingForHuman.can_transition_to(AutoProcessing));

        // No shortcut from submission to closure.
        assert!(!Received.can_transition_to(Closed));
        assert!(!Queued.can_transition_to(Closed));
        assert!(!Received.can_transition_to(WaitingForHuman));
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        use CaseStatus::*;
        let all = [Received, Queued, AutoProcessing, WaitingForHuman, Closed, Error];
        for next in all {
            assert!(!Closed.can_transition_to(next));
            assert!(!Error.can_transition_to(next));
        }
        assert!(Closed.is_terminal());
        assert!(Error.is_terminal());
        assert!(!WaitingForHuman.is_terminal());
    }

    #[test]
    fn serde_uses_wire_strings() {
        let json = serde_json::to_string(&CaseStatus::WaitingForHuman).unwrap();
        assert_eq!(json, "\"WAITING_FOR_HUMAN\"");
        let status: CaseStatus = serde_json::from_str("\"AUTO_PROCESSING\"").unwrap();
        assert_eq!(status, CaseStatus::AutoProcessing);
        assert!(serde_json::from_str::<CaseStatus>("\"waiting\"").is_err());
    }

    #[test]
    fn document_kind_round_trips() {
        assert_eq!(
            DocumentKind::from_str("landlord_confirmation").unwrap(),
            DocumentKind::LandlordConfirmation
        );
        assert_eq!(DocumentKind::RegistrationForm.as_str(), "registration_form");
    }
}
