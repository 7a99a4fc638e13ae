use mongodb::bson::{oid::ObjectId, serde_helpers::serialize_object_id_as_hex_string};
use serde::Serialize;

/// Raw per-option counts as read from the store, in option order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollCounts {
    pub poll_id: ObjectId,
    pub options: Vec<OptionCount>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionCount {
    pub option_id: ObjectId,
    pub text: String,
    pub votes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionTally {
    pub text: String,
    pub votes: u64,
}

/// The tally of a poll at one point in time. Serializes to the broadcast
/// payload: `{"pollId": "...", "results": [{"text": "...", "votes": 0}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallySnapshot {
    #[serde(serialize_with = "serialize_object_id_as_hex_string")]
    pub poll_id: ObjectId,
    pub results: Vec<OptionTally>,
}

impl From<PollCounts> for TallySnapshot {
    fn from(counts: PollCounts) -> Self {
        Self {
            poll_id: counts.poll_id,
            results: counts
                .options
                .into_iter()
                .map(|option| OptionTally {
                    text: option.text,
                    votes: option.votes,
                })
                .collect(),
        }
    }
}

impl TallySnapshot {
    /// Sum of all option counts. Votes are never removed, so this grows
    /// monotonically per poll and orders snapshots of the same poll.
    pub fn total_votes(&self) -> u64 {
        self.results.iter().map(|option| option.votes).sum()
    }

    pub fn votes_for(&self, text: &str) -> Option<u64> {
        self.results
            .iter()
            .find(|option| option.text == text)
            .map(|option| option.votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(poll_id: ObjectId) -> PollCounts {
        PollCounts {
            poll_id,
            options: vec![
                OptionCount {
                    option_id: ObjectId::new(),
                    text: "Red".to_string(),
                    votes: 3,
                },
                OptionCount {
                    option_id: ObjectId::new(),
                    text: "Blue".to_string(),
                    votes: 1,
                },
            ],
        }
    }

    #[test]
    fn snapshot_keeps_option_order() {
        let snapshot = TallySnapshot::from(counts(ObjectId::new()));

        let texts: Vec<&str> = snapshot.results.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["Red", "Blue"]);
        assert_eq!(snapshot.total_votes(), 4);
        assert_eq!(snapshot.votes_for("Blue"), Some(1));
        assert_eq!(snapshot.votes_for("Green"), None);
    }

    #[test]
    fn payload_uses_hex_poll_id() {
        let poll_id = ObjectId::new();
        let snapshot = TallySnapshot::from(counts(poll_id));

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["pollId"], poll_id.to_hex());
        assert_eq!(value["results"][0]["text"], "Red");
        assert_eq!(value["results"][0]["votes"], 3);
        assert_eq!(value["results"][1]["votes"], 1);
    }
}
