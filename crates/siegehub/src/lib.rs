//! Competitive matchmaking and settlement engine for a community arena.
//!
//! The engine owns everything between "someone asked for a match" and
//! "results are on the board": a durable player ledger, eligibility gating,
//! ad-hoc team rosters, timed community votes, a single-slot match state
//! machine, exactly-once settlement with rank-role sync, an append-only
//! dispute log, and a daily currency claim.
//!
//! The chat platform sits behind the [`adapter::ChatAdapter`] seam and
//! persistence behind the [`store::Store`] seam, so the whole engine runs and
//! tests in-process with no external services.

pub mod adapter;
pub mod config;
pub mod daily;
pub mod dispute;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod orchestrator;
pub mod roster;
pub mod settlement;
pub mod store;
pub mod testing;
pub mod types;
pub mod voting;

pub use adapter::ChatAdapter;
pub use config::HubConfig;
pub use daily::DailyClaims;
pub use dispute::DisputeLog;
pub use error::HubError;
pub use gate::EligibilityGate;
pub use ledger::{LedgerDelta, PlayerLedger, PlayerRecord};
pub use orchestrator::{MatchOrchestrator, MatchReport, PhaseKind};
pub use roster::RosterManager;
pub use settlement::SettlementService;
pub use store::{MemoryStore, Store};
pub use types::{MatchFormat, MatchId, MatchRecord, PlayerId, RankTier, Side, Winner};
