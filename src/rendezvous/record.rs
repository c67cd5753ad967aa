//! The shared rendezvous record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Shared completion flags, one per party.
///
/// Stored as a flat JSON object (`{"alice": true}`) so each party can merge
/// its own flag without reading the other's first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RendezvousRecord(pub BTreeMap<String, bool>);

impl RendezvousRecord {
    #[must_use]
    pub fn is_marked(&self, party: &str) -> bool {
        self.0.get(party).copied().unwrap_or(false)
    }

    /// Have all `parties` marked themselves complete?
    #[must_use]
    pub fn is_complete<S: AsRef<str>>(&self, parties: &[S]) -> bool {
        parties.iter().all(|p| self.is_marked(p.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_completion() {
        let parties = ["alice", "bob"];
        let mut record = RendezvousRecord::default();
        assert!(!record.is_complete(&parties));

        record.0.insert("alice".into(), true);
        assert!(record.is_marked("alice"));
        assert!(!record.is_complete(&parties));

        record.0.insert("bob".into(), false);
        assert!(!record.is_complete(&parties));

        record.0.insert("bob".into(), true);
        assert!(record.is_complete(&parties));
    }

    #[test]
    fn test_flat_json_shape() {
        let record: RendezvousRecord = serde_json::from_value(json!({"alice": true})).unwrap();
        assert!(record.is_marked("alice"));
        assert_eq!(serde_json::to_value(&record).unwrap(), json!({"alice": true}));
    }
}
