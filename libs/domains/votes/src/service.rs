use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::VoteConfig;
use crate::error::{VoteError, VoteResult};
use crate::locks::{PairGuard, PairLocks};
use crate::models::{RevokeReceipt, Vote, VoteReceipt, VoteValue};
use crate::repository::{RatingAggregator, TargetState, VoteLedger, VoteStore, VoteTransaction};

/// Orchestrates ledger writes and rating recomputes for likes, dislikes and
/// revokes.
///
/// Each mutation is one store transaction: the ledger change and the
/// recompute commit together or not at all. The store serializes writers of
/// a pair across processes; `PairLocks` queues callers of this process before
/// they reach the store. Once started, a mutation runs to completion in its
/// own task, so a client disconnect does not cut it short.
pub struct VoteService<S: VoteStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    locks: PairLocks,
    config: VoteConfig,
}

impl<S: VoteStore> VoteService<S> {
    pub fn new(store: S, config: VoteConfig) -> Self {
        Self {
            store: Arc::new(store),
            clock: Arc::new(SystemClock),
            locks: PairLocks::new(),
            config,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &VoteConfig {
        &self.config
    }

    /// Record `voter_id`'s vote for `target_id` and return the new rating.
    ///
    /// A second cast for the same pair overwrites the first, but only once
    /// the cooldown since the previous cast has passed. That holds even when
    /// the value does not change. Soft-deleted users cannot receive votes.
    pub async fn cast(
        &self,
        voter_id: Uuid,
        target_id: Uuid,
        value: i32,
    ) -> VoteResult<VoteReceipt> {
        if voter_id == target_id {
            return Err(VoteError::SelfVote);
        }
        let value = VoteValue::try_from(value)?;

        let guard = self.lock_pair(voter_id, target_id).await?;
        let store = self.store.clone();
        let clock = self.clock.clone();
        let cooldown = self.config.cooldown;

        let receipt = run_detached(guard, async move {
            let mut tx = store.begin(voter_id, target_id).await?;
            // Read after the pair is locked, so no earlier cast is stamped later
            let now = clock.now();
            let receipt = cast_in(&mut tx, voter_id, target_id, value, now, cooldown).await?;
            tx.commit().await?;
            Ok(receipt)
        })
        .await?;

        tracing::info!(
            vote_id = %receipt.vote_id,
            voter_id = %voter_id,
            target_id = %target_id,
            value = receipt.value,
            rating = receipt.rating,
            "Vote cast"
        );
        Ok(receipt)
    }

    /// Remove `voter_id`'s vote for `target_id`. Not subject to the cooldown,
    /// and allowed after the target was soft-deleted.
    pub async fn revoke(&self, voter_id: Uuid, target_id: Uuid) -> VoteResult<RevokeReceipt> {
        if voter_id == target_id {
            return Err(VoteError::SelfVote);
        }

        let guard = self.lock_pair(voter_id, target_id).await?;
        let store = self.store.clone();

        let receipt = run_detached(guard, async move {
            let mut tx = store.begin(voter_id, target_id).await?;
            tx.lock_target(target_id).await?;
            tx.remove(voter_id, target_id).await?;
            let rating = tx.recompute(target_id).await?;
            tx.commit().await?;
            Ok(RevokeReceipt { target_id, rating })
        })
        .await?;

        tracing::info!(
            voter_id = %voter_id,
            target_id = %target_id,
            rating = receipt.rating,
            "Vote revoked"
        );
        Ok(receipt)
    }

    /// Current rating of `target_id`
    pub async fn rating(&self, target_id: Uuid) -> VoteResult<i64> {
        self.store.current(target_id).await
    }

    async fn lock_pair(&self, voter_id: Uuid, target_id: Uuid) -> VoteResult<PairGuard> {
        tokio::time::timeout(
            self.config.lock_timeout,
            self.locks.acquire(voter_id, target_id),
        )
        .await
        .map_err(|_| {
            tracing::warn!(
                voter_id = %voter_id,
                target_id = %target_id,
                timeout = ?self.config.lock_timeout,
                "Timed out waiting for vote lock"
            );
            VoteError::Timeout
        })
    }
}

/// Run `work` in its own task while holding `guard`.
async fn run_detached<T, F>(guard: PairGuard, work: F) -> VoteResult<T>
where
    T: Send + 'static,
    F: Future<Output = VoteResult<T>> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let _guard = guard;
        work.await
    });

    handle.await.map_err(|e| {
        tracing::error!(error = %e, "Vote task did not complete");
        VoteError::Cancelled
    })?
}

/// Cast steps inside an open transaction. Any error leaves the transaction
/// uncommitted.
async fn cast_in<T: VoteTransaction>(
    tx: &mut T,
    voter_id: Uuid,
    target_id: Uuid,
    value: VoteValue,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> VoteResult<VoteReceipt> {
    if tx.lock_target(target_id).await? == TargetState::Deleted {
        return Err(VoteError::UnknownTarget(target_id));
    }

    let vote = match tx.find(voter_id, target_id).await? {
        None => Vote::new(voter_id, target_id, value, now),
        Some(previous) => {
            check_cooldown(&previous, now, cooldown)?;
            Vote {
                value,
                created_at: now,
                ..previous
            }
        }
    };

    let stored = tx.put(vote).await?;
    let rating = tx.recompute(target_id).await?;
    Ok(VoteReceipt::new(&stored, rating))
}

fn check_cooldown(previous: &Vote, now: DateTime<Utc>, cooldown: Duration) -> VoteResult<()> {
    let cooldown = TimeDelta::from_std(cooldown).unwrap_or(TimeDelta::MAX);
    let elapsed = now - previous.created_at;

    if elapsed >= cooldown {
        return Ok(());
    }

    // A previous cast stamped in the future never waits longer than one cooldown
    let remaining = (cooldown - elapsed).min(cooldown);
    Err(VoteError::Cooldown {
        remaining: remaining.to_std().unwrap_or_default(),
    })
}
