use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a single run of a blueprint. Generated at run submission time,
/// never supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(Uuid);

impl ExecutionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ExecutionId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(BlueprintId, "Identifies a blueprint, stable across revisions.");
string_id!(NodeId, "Identifies a node within a single blueprint.");
string_id!(OrgId, "Identifies a tenant/organization for scoping and budgets.");
string_id!(UserId, "Identifies the acting user, carried through the run context.");
string_id!(SessionId, "Identifies a conversational/agent session, used for memory scoping.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_ids_are_unique() {
        let a = ExecutionId::new();
        let b = ExecutionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn execution_id_roundtrips_through_uuid() {
        let uuid = Uuid::new_v4();
        let id = ExecutionId::from(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn string_id_display_matches_source() {
        let id = NodeId::new("n1");
        assert_eq!(id.to_string(), "n1");
        assert_eq!(id.as_str(), "n1");
    }

    #[test]
    fn string_id_serde_roundtrip() {
        let id = BlueprintId::new("bp-42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"bp-42\"");
        let back: BlueprintId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn string_id_ordering_is_lexicographic() {
        let mut ids = vec![NodeId::new("n3"), NodeId::new("n1"), NodeId::new("n2")];
        ids.sort();
        assert_eq!(ids, vec![NodeId::new("n1"), NodeId::new("n2"), NodeId::new("n3")]);
    }
}
