use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, FromQueryResult,
    Statement, TransactionTrait,
};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{VoteError, VoteResult};
use crate::models::{Vote, VoteValue};
use crate::repository::{RatingAggregator, TargetState, VoteLedger, VoteStore, VoteTransaction};

const VOTE_COLUMNS: &str = "id, voter_id, target_id, value, created_at";

#[derive(Debug, FromQueryResult)]
struct VoteRow {
    id: Uuid,
    voter_id: Uuid,
    target_id: Uuid,
    value: i16,
    created_at: DateTime<Utc>,
}

impl TryFrom<VoteRow> for Vote {
    type Error = VoteError;

    fn try_from(row: VoteRow) -> Result<Self, Self::Error> {
        let value = VoteValue::try_from(i32::from(row.value)).map_err(|_| {
            VoteError::Storage(format!("Stored vote {} has value {}", row.id, row.value))
        })?;

        Ok(Vote {
            id: row.id,
            voter_id: row.voter_id,
            target_id: row.target_id,
            value,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromQueryResult)]
struct RatingRow {
    rating: i64,
}

#[derive(Debug, FromQueryResult)]
struct TargetRow {
    deleted: bool,
}

fn db_error(e: DbErr) -> VoteError {
    // SQLSTATE 55P03, raised once `lock_timeout` expires
    if e.to_string().contains("lock timeout") {
        return VoteError::Timeout;
    }
    VoteError::Storage(format!("Database error: {}", e))
}

/// Largest value Postgres accepts for `lock_timeout` (an int, in ms)
const MAX_LOCK_TIMEOUT_MS: u64 = i32::MAX as u64;

/// Whole milliseconds for `SET LOCAL lock_timeout`; 0 would disable it.
fn lock_timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis())
        .unwrap_or(u64::MAX)
        .clamp(1, MAX_LOCK_TIMEOUT_MS)
}

async fn find_vote<C: ConnectionTrait>(
    conn: &C,
    voter_id: Uuid,
    target_id: Uuid,
    for_update: bool,
) -> VoteResult<Option<Vote>> {
    let sql = format!(
        "SELECT {} FROM votes WHERE voter_id = $1 AND target_id = $2{}",
        VOTE_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        sql,
        [voter_id.into(), target_id.into()],
    );

    VoteRow::find_by_statement(stmt)
        .one(conn)
        .await
        .map_err(db_error)?
        .map(Vote::try_from)
        .transpose()
}

/// PostgreSQL vote store over the `votes` table and `users.rating`
#[derive(Clone)]
pub struct PgVoteStore {
    db: DatabaseConnection,
    lock_timeout: Option<Duration>,
}

impl PgVoteStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            lock_timeout: None,
        }
    }

    /// Upper bound on any row or advisory lock wait inside a transaction;
    /// exceeding it fails the operation with `Timeout`.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Committed vote for the pair
    pub async fn find(&self, voter_id: Uuid, target_id: Uuid) -> VoteResult<Option<Vote>> {
        find_vote(&self.db, voter_id, target_id, false).await
    }

    /// Sum of the committed votes for `target_id`
    pub async fn ledger_sum(&self, target_id: Uuid) -> VoteResult<i64> {
        let sql = "SELECT COALESCE(SUM(value), 0)::BIGINT AS rating FROM votes WHERE target_id = $1";
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [target_id.into()]);

        Ok(RatingRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(db_error)?
            .map_or(0, |r| r.rating))
    }
}

#[async_trait]
impl VoteStore for PgVoteStore {
    type Tx = PgVoteTransaction;

    async fn begin(&self, voter_id: Uuid, target_id: Uuid) -> VoteResult<PgVoteTransaction> {
        let txn = self.db.begin().await.map_err(db_error)?;

        if let Some(timeout) = self.lock_timeout {
            let millis = lock_timeout_millis(timeout);
            txn.execute_unprepared(&format!("SET LOCAL lock_timeout = '{}ms'", millis))
                .await
                .map_err(db_error)?;
        }

        // Serializes every writer of the pair, including casts that find no
        // row to lock yet. Released at commit or rollback.
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT pg_advisory_xact_lock(hashtextextended($1::uuid::text || $2::uuid::text, 0))",
            [voter_id.into(), target_id.into()],
        );
        txn.query_one_raw(stmt).await.map_err(db_error)?;

        Ok(PgVoteTransaction { txn: Some(txn) })
    }

    async fn current(&self, target_id: Uuid) -> VoteResult<i64> {
        let sql = "SELECT rating FROM users WHERE id = $1 AND deleted_at IS NULL";
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [target_id.into()]);

        RatingRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(db_error)?
            .map(|r| r.rating)
            .ok_or(VoteError::UnknownTarget(target_id))
    }
}

/// One vote change inside a PostgreSQL transaction. Rolled back on drop
/// unless committed.
pub struct PgVoteTransaction {
    txn: Option<DatabaseTransaction>,
}

impl PgVoteTransaction {
    fn txn(&self) -> VoteResult<&DatabaseTransaction> {
        self.txn
            .as_ref()
            .ok_or_else(|| VoteError::Storage("Transaction already committed".to_string()))
    }
}

#[async_trait]
impl VoteLedger for PgVoteTransaction {
    async fn find(&mut self, voter_id: Uuid, target_id: Uuid) -> VoteResult<Option<Vote>> {
        find_vote(self.txn()?, voter_id, target_id, true).await
    }

    async fn put(&mut self, vote: Vote) -> VoteResult<Vote> {
        let sql = format!(
            r#"
            INSERT INTO votes (id, voter_id, target_id, value, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (voter_id, target_id)
            DO UPDATE SET value = EXCLUDED.value, created_at = EXCLUDED.created_at
            RETURNING {}
            "#,
            VOTE_COLUMNS
        );
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                vote.id.into(),
                vote.voter_id.into(),
                vote.target_id.into(),
                (vote.value.weight() as i16).into(),
                vote.created_at.into(),
            ],
        );

        let row = VoteRow::find_by_statement(stmt)
            .one(self.txn()?)
            .await
            .map_err(|e| {
                let err_str = e.to_string();
                if err_str.contains("fk_votes_target_id") {
                    VoteError::UnknownTarget(vote.target_id)
                } else if err_str.contains("fk_votes_voter_id") {
                    VoteError::UnknownTarget(vote.voter_id)
                } else {
                    db_error(e)
                }
            })?
            .ok_or_else(|| VoteError::Storage("Upsert returned no row".to_string()))?;

        tracing::debug!(vote_id = %row.id, voter_id = %row.voter_id, target_id = %row.target_id, "Stored vote");
        row.try_into()
    }

    async fn remove(&mut self, voter_id: Uuid, target_id: Uuid) -> VoteResult<Vote> {
        let sql = format!(
            "DELETE FROM votes WHERE voter_id = $1 AND target_id = $2 RETURNING {}",
            VOTE_COLUMNS
        );
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [voter_id.into(), target_id.into()],
        );

        VoteRow::find_by_statement(stmt)
            .one(self.txn()?)
            .await
            .map_err(db_error)?
            .ok_or(VoteError::NotFound {
                voter: voter_id,
                target: target_id,
            })?
            .try_into()
    }
}

#[async_trait]
impl RatingAggregator for PgVoteTransaction {
    async fn recompute(&mut self, target_id: Uuid) -> VoteResult<i64> {
        let sql = r#"
            UPDATE users
            SET rating = (SELECT COALESCE(SUM(value), 0) FROM votes WHERE target_id = $1)::BIGINT,
                rating_updated_at = NOW()
            WHERE id = $1
            RETURNING rating
        "#;
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [target_id.into()]);

        RatingRow::find_by_statement(stmt)
            .one(self.txn()?)
            .await
            .map_err(db_error)?
            .map(|r| r.rating)
            .ok_or(VoteError::UnknownTarget(target_id))
    }
}

#[async_trait]
impl VoteTransaction for PgVoteTransaction {
    async fn lock_target(&mut self, target_id: Uuid) -> VoteResult<TargetState> {
        // NO KEY UPDATE serializes recomputes of the target without blocking
        // the key-share locks that foreign key checks on `votes` take.
        let sql =
            "SELECT deleted_at IS NOT NULL AS deleted FROM users WHERE id = $1 FOR NO KEY UPDATE";
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [target_id.into()]);

        let row = TargetRow::find_by_statement(stmt)
            .one(self.txn()?)
            .await
            .map_err(db_error)?
            .ok_or(VoteError::UnknownTarget(target_id))?;

        Ok(if row.deleted {
            TargetState::Deleted
        } else {
            TargetState::Active
        })
    }

    async fn commit(&mut self) -> VoteResult<()> {
        let txn = self
            .txn
            .take()
            .ok_or_else(|| VoteError::Storage("Transaction already committed".to_string()))?;
        txn.commit().await.map_err(db_error)
    }
}
