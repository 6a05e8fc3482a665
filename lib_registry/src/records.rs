//! # Record Types
//!
//! The data model shared by every storage backend and service:
//! vote records, anonymized vote listings, aggregated counts and
//! guestbook message records.
//!
//! Wire names are camelCase (`voteType`, `browserId`, `createdAt`,
//! `submissionId`) to stay compatible with the JSON API the frontend
//! already speaks.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two allowed gender predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Boy,
    Girl,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Boy => "boy",
            VoteType::Girl => "girl",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a request carries a choice outside `boy`/`girl`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid vote type")]
pub struct InvalidVoteType;

impl FromStr for VoteType {
    type Err = InvalidVoteType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boy" => Ok(VoteType::Boy),
            "girl" => Ok(VoteType::Girl),
            _ => Err(InvalidVoteType),
        }
    }
}

/// A stored gender-prediction vote. At most one exists per browser id;
/// once cast it is immutable until retracted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub id: i64,
    pub browser_id: String,
    pub vote_type: VoteType,
    /// Origin address, informational only. Never exposed through the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The anonymized projection of a vote served by `GET /api/votes/all`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicVote {
    pub vote_type: VoteType,
    pub created_at: DateTime<Utc>,
}

impl From<&VoteRecord> for PublicVote {
    fn from(record: &VoteRecord) -> Self {
        Self {
            vote_type: record.vote_type,
            created_at: record.created_at,
        }
    }
}

/// Aggregated vote counts. Always satisfies `total == boy + girl`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub boy: i64,
    pub girl: i64,
    pub total: i64,
}

impl VoteCounts {
    /// Rounded percentages `(boy, girl)`, derived and never stored.
    /// An empty tally yields 0% for both sides.
    pub fn percentages(&self) -> (u32, u32) {
        if self.total == 0 {
            return (0, 0);
        }
        let pct = |count: i64| ((count as f64 / self.total as f64) * 100.0).round() as u32;
        (pct(self.boy), pct(self.girl))
    }
}

/// A stored guestbook message. At most one exists per browser id; a
/// resubmission by the same identity replaces name/body/timestamp in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: i64,
    pub browser_id: String,
    pub name: String,
    pub message: String,
    pub submission_id: Option<String>,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_type_parses_only_allowed_values() {
        assert_eq!("boy".parse::<VoteType>().unwrap(), VoteType::Boy);
        assert_eq!("girl".parse::<VoteType>().unwrap(), VoteType::Girl);
        assert!("BOY".parse::<VoteType>().is_err());
        assert!("other".parse::<VoteType>().is_err());
    }

    #[test]
    fn test_percentages_empty_tally_is_zero() {
        let counts = VoteCounts::default();
        assert_eq!(counts.percentages(), (0, 0));
    }

    #[test]
    fn test_percentages_round_to_nearest() {
        let counts = VoteCounts {
            boy: 1,
            girl: 2,
            total: 3,
        };
        assert_eq!(counts.percentages(), (33, 67));
    }

    #[test]
    fn test_message_record_wire_names() {
        let record = MessageRecord {
            id: 7,
            browser_id: "b1".to_string(),
            name: "Ann".to_string(),
            message: "hi".to_string(),
            submission_id: None,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("browserId").is_some());
        assert!(value.get("submissionId").is_some());
        assert!(value.get("timestamp").is_some());
        assert!(value.get("created_at").is_none());
    }
}
