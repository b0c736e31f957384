use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::VoteError;

/// Direction of a vote. Serialized as its numeric weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum VoteValue {
    Like,
    Dislike,
}

impl VoteValue {
    pub fn weight(self) -> i32 {
        match self {
            VoteValue::Like => 1,
            VoteValue::Dislike => -1,
        }
    }
}

impl From<VoteValue> for i32 {
    fn from(value: VoteValue) -> Self {
        value.weight()
    }
}

impl TryFrom<i32> for VoteValue {
    type Error = VoteError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteValue::Like),
            -1 => Ok(VoteValue::Dislike),
            other => Err(VoteError::InvalidValue(other)),
        }
    }
}

/// A single vote. At most one exists per (voter, target).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub voter_id: Uuid,
    pub target_id: Uuid,
    pub value: VoteValue,
    /// Time of the last cast; the cooldown is measured from here
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(voter_id: Uuid, target_id: Uuid, value: VoteValue, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            voter_id,
            target_id,
            value,
            created_at: now,
        }
    }
}

/// Result of a successful like or dislike
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VoteReceipt {
    pub vote_id: Uuid,
    pub voter_id: Uuid,
    pub target_id: Uuid,
    /// 1 for like, -1 for dislike
    pub value: i32,
    /// Target's rating after the vote
    pub rating: i64,
    pub created_at: DateTime<Utc>,
}

impl VoteReceipt {
    pub fn new(vote: &Vote, rating: i64) -> Self {
        Self {
            vote_id: vote.id,
            voter_id: vote.voter_id,
            target_id: vote.target_id,
            value: vote.value.weight(),
            rating,
            created_at: vote.created_at,
        }
    }
}

/// Result of revoking a vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RevokeReceipt {
    pub target_id: Uuid,
    pub rating: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RatingResponse {
    pub user_id: Uuid,
    pub rating: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_value_from_weight() {
        assert_eq!(VoteValue::try_from(1).unwrap(), VoteValue::Like);
        assert_eq!(VoteValue::try_from(-1).unwrap(), VoteValue::Dislike);
        assert!(matches!(
            VoteValue::try_from(0),
            Err(VoteError::InvalidValue(0))
        ));
        assert!(matches!(
            VoteValue::try_from(2),
            Err(VoteError::InvalidValue(2))
        ));
    }

    #[test]
    fn test_vote_value_serializes_as_number() {
        assert_eq!(serde_json::to_string(&VoteValue::Dislike).unwrap(), "-1");
        let parsed: VoteValue = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, VoteValue::Like);
        assert!(serde_json::from_str::<VoteValue>("5").is_err());
    }

    #[test]
    fn test_receipt_from_vote() {
        let vote = Vote::new(Uuid::now_v7(), Uuid::now_v7(), VoteValue::Dislike, Utc::now());
        let receipt = VoteReceipt::new(&vote, -3);

        assert_eq!(receipt.vote_id, vote.id);
        assert_eq!(receipt.value, -1);
        assert_eq!(receipt.rating, -3);
    }
}
