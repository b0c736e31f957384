//! Votes Domain
//!
//! Peer rating: each user may like (+1) or dislike (-1) any other user once.
//! A user's rating is the sum of the votes they received.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← like / dislike / revoke / rating endpoints
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ VoteService │  ← self-vote check, cooldown, per-pair locking
//! └──────┬──────┘
//!        │ VoteStore::begin
//! ┌──────▼────────────────────┐
//! │ VoteTransaction           │  ← one commit per cast / revoke
//! │  Ledger      Aggregator   │  ← vote rows / users.rating
//! └───────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_votes::{InMemoryVoteStore, VoteConfig, VoteService};
//!
//! let store = InMemoryVoteStore::new();
//! let service = VoteService::new(store, VoteConfig::default());
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod locks;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::VoteConfig;
pub use error::{VoteError, VoteResult};
pub use handlers::ApiDoc;
pub use models::{RatingResponse, RevokeReceipt, Vote, VoteReceipt, VoteValue};
pub use postgres::{PgVoteStore, PgVoteTransaction};
pub use repository::{
    InMemoryTransaction, InMemoryVoteStore, RatingAggregator, TargetState, VoteLedger, VoteStore,
    VoteTransaction,
};
pub use service::VoteService;
