use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use uuid::Uuid;

use crate::error::{VoteError, VoteResult};
use crate::models::Vote;

/// Vote rows, at most one per (voter, target), as seen inside one unit of
/// work.
#[async_trait]
pub trait VoteLedger: Send {
    /// The vote `voter_id` gave `target_id`, if any
    async fn find(&mut self, voter_id: Uuid, target_id: Uuid) -> VoteResult<Option<Vote>>;

    /// Insert the vote, or overwrite value and created_at of the existing
    /// row for the same pair (keeping its id)
    async fn put(&mut self, vote: Vote) -> VoteResult<Vote>;

    /// Delete and return the pair's vote; `NotFound` when there is none
    async fn remove(&mut self, voter_id: Uuid, target_id: Uuid) -> VoteResult<Vote>;
}

/// Owner of the derived `rating` column on users.
#[async_trait]
pub trait RatingAggregator: Send {
    /// Re-sum every vote for `target_id`, store it as the user's rating and
    /// return it. Idempotent. Soft-deleted users are recomputed too.
    async fn recompute(&mut self, target_id: Uuid) -> VoteResult<i64>;
}

/// Whether a user can still receive new votes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Active,
    Deleted,
}

/// One atomic vote change. Nothing done through it is visible to other
/// writers until `commit`; dropping it uncommitted discards every change.
#[async_trait]
pub trait VoteTransaction: VoteLedger + RatingAggregator {
    /// Lock the target's user row until the end of the transaction.
    /// `UnknownTarget` when no such user exists.
    async fn lock_target(&mut self, target_id: Uuid) -> VoteResult<TargetState>;

    async fn commit(&mut self) -> VoteResult<()>;
}

/// Backend the vote service opens its transactions on.
#[async_trait]
pub trait VoteStore: Send + Sync + 'static {
    type Tx: VoteTransaction + 'static;

    /// Start a transaction holding the (voter, target) pair exclusively, for
    /// every process sharing the store.
    async fn begin(&self, voter_id: Uuid, target_id: Uuid) -> VoteResult<Self::Tx>;

    /// Last stored rating for an active user
    async fn current(&self, target_id: Uuid) -> VoteResult<i64>;
}

#[derive(Debug, Clone, Copy, Default)]
struct RatingRecord {
    rating: i64,
    updated_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct StoreState {
    votes: HashMap<(Uuid, Uuid), Vote>,
    users: HashMap<Uuid, RatingRecord>,
}

/// In-memory vote store (for development/testing).
///
/// Users have to be registered before they can vote or be voted for. A
/// transaction holds the store's write lock from `begin` until it is
/// committed or dropped.
#[derive(Debug, Default, Clone)]
pub struct InMemoryVoteStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_user(&self, user_id: Uuid) {
        self.state
            .write()
            .await
            .users
            .entry(user_id)
            .or_default();
    }

    /// Mark the user deleted; their votes and rating stay.
    pub async fn soft_delete_user(&self, user_id: Uuid) {
        if let Some(record) = self.state.write().await.users.get_mut(&user_id) {
            record.deleted_at = Some(Utc::now());
        }
    }

    /// Drop a user together with every vote they gave or received.
    pub async fn remove_user(&self, user_id: Uuid) {
        let mut state = self.state.write().await;
        state.users.remove(&user_id);
        state
            .votes
            .retain(|(voter, target), _| *voter != user_id && *target != user_id);
    }

    /// Committed vote for the pair
    pub async fn vote(&self, voter_id: Uuid, target_id: Uuid) -> Option<Vote> {
        self.state
            .read()
            .await
            .votes
            .get(&(voter_id, target_id))
            .cloned()
    }

    /// Sum of the committed votes for `target_id`, whatever the stored rating
    /// says
    pub async fn ledger_sum(&self, target_id: Uuid) -> i64 {
        sum_for(&self.state.read().await.votes, target_id)
    }

    /// When the user's rating was last recomputed
    pub async fn rating_updated_at(&self, user_id: Uuid) -> Option<DateTime<Utc>> {
        self.state
            .read()
            .await
            .users
            .get(&user_id)
            .and_then(|r| r.updated_at)
    }

    pub async fn vote_count(&self) -> usize {
        self.state.read().await.votes.len()
    }
}

fn sum_for(votes: &HashMap<(Uuid, Uuid), Vote>, target_id: Uuid) -> i64 {
    votes
        .values()
        .filter(|v| v.target_id == target_id)
        .map(|v| i64::from(v.value.weight()))
        .sum()
}

#[async_trait]
impl VoteStore for InMemoryVoteStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self, _voter_id: Uuid, _target_id: Uuid) -> VoteResult<InMemoryTransaction> {
        Ok(InMemoryTransaction {
            state: self.state.clone().write_owned().await,
            undo: Vec::new(),
        })
    }

    async fn current(&self, target_id: Uuid) -> VoteResult<i64> {
        let state = self.state.read().await;
        state
            .users
            .get(&target_id)
            .filter(|r| r.deleted_at.is_none())
            .map(|r| r.rating)
            .ok_or(VoteError::UnknownTarget(target_id))
    }
}

#[derive(Debug)]
enum Undo {
    Vote {
        key: (Uuid, Uuid),
        previous: Option<Vote>,
    },
    Rating {
        user_id: Uuid,
        previous: RatingRecord,
    },
}

/// Transaction over [`InMemoryVoteStore`]; changes are applied in place and
/// reverted on drop unless committed.
#[derive(Debug)]
pub struct InMemoryTransaction {
    state: OwnedRwLockWriteGuard<StoreState>,
    undo: Vec<Undo>,
}

#[async_trait]
impl VoteLedger for InMemoryTransaction {
    async fn find(&mut self, voter_id: Uuid, target_id: Uuid) -> VoteResult<Option<Vote>> {
        Ok(self.state.votes.get(&(voter_id, target_id)).cloned())
    }

    async fn put(&mut self, vote: Vote) -> VoteResult<Vote> {
        for user_id in [vote.voter_id, vote.target_id] {
            if !self.state.users.contains_key(&user_id) {
                return Err(VoteError::UnknownTarget(user_id));
            }
        }

        let key = (vote.voter_id, vote.target_id);
        let previous = self.state.votes.get(&key).cloned();
        let stored = match &previous {
            Some(existing) => Vote {
                value: vote.value,
                created_at: vote.created_at,
                ..existing.clone()
            },
            None => vote,
        };

        self.state.votes.insert(key, stored.clone());
        self.undo.push(Undo::Vote { key, previous });
        Ok(stored)
    }

    async fn remove(&mut self, voter_id: Uuid, target_id: Uuid) -> VoteResult<Vote> {
        let key = (voter_id, target_id);
        let removed = self.state.votes.remove(&key).ok_or(VoteError::NotFound {
            voter: voter_id,
            target: target_id,
        })?;

        self.undo.push(Undo::Vote {
            key,
            previous: Some(removed.clone()),
        });
        Ok(removed)
    }
}

#[async_trait]
impl RatingAggregator for InMemoryTransaction {
    async fn recompute(&mut self, target_id: Uuid) -> VoteResult<i64> {
        let rating = sum_for(&self.state.votes, target_id);

        let record = self
            .state
            .users
            .get_mut(&target_id)
            .ok_or(VoteError::UnknownTarget(target_id))?;
        let previous = *record;
        record.rating = rating;
        record.updated_at = Some(Utc::now());

        self.undo.push(Undo::Rating {
            user_id: target_id,
            previous,
        });
        Ok(rating)
    }
}

#[async_trait]
impl VoteTransaction for InMemoryTransaction {
    async fn lock_target(&mut self, target_id: Uuid) -> VoteResult<TargetState> {
        match self.state.users.get(&target_id) {
            None => Err(VoteError::UnknownTarget(target_id)),
            Some(record) if record.deleted_at.is_some() => Ok(TargetState::Deleted),
            Some(_) => Ok(TargetState::Active),
        }
    }

    async fn commit(&mut self) -> VoteResult<()> {
        self.undo.clear();
        Ok(())
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        while let Some(step) = self.undo.pop() {
            match step {
                Undo::Vote { key, previous } => match previous {
                    Some(vote) => {
                        self.state.votes.insert(key, vote);
                    }
                    None => {
                        self.state.votes.remove(&key);
                    }
                },
                Undo::Rating { user_id, previous } => {
                    self.state.users.insert(user_id, previous);
                }
            }
        }
    }
}
