//! # wf_kb
//!
//! Knowledge base for Website Factory.
//!
//! Stores what the fix cycle learns: every failure that was repaired is kept
//! as an [`Incident`] keyed by its error signature, with the patch that fixed
//! it and a confidence score that moves up when the fix is reused
//! successfully and down when it regresses. The same database holds the
//! session ledger and per-role prompt overrides.
//!
//! ## Components
//!
//! - [`signature`]: reduces a raw failure log to a stable key
//! - [`IncidentStore`]: known solutions, similar incidents, upsert, reinforcement
//! - [`SessionLedger`]: one record per generation run, terminal states are write-once
//! - [`PromptStore`]: active prompt overrides per agent role
//! - [`KnowledgeBase`]: the SQLite implementation of all three
//! - [`OfflineStore`]: stand-in used when the database cannot be opened
//!
//! ## Example
//!
//! ```rust,no_run
//! use wf_kb::{signature, IncidentStore, KnowledgeBase};
//!
//! let kb = KnowledgeBase::open("wf-kb.sqlite").unwrap();
//! if let Some(sig) = signature("Error: Module not found: Can't resolve './Hero'\n") {
//!     let known = kb.find_known_solution(&sig).unwrap();
//!     println!("{} -> {:?}", sig, known.map(|p| p.file_path));
//! }
//! ```

pub mod error;
pub mod models;
pub mod offline;
pub mod schema;
pub mod signature;
pub mod sqlite;
pub mod store;

pub use error::{KbError, KbResult};
pub use models::{
    AgentPrompt, Incident, KbStats, NewIncident, Patch, SaveOutcome, SessionRecord, SessionStatus,
};
pub use offline::OfflineStore;
pub use signature::signature;
pub use sqlite::KnowledgeBase;
pub use store::{IncidentStore, PromptStore, SessionLedger};

/// Default confidence of a newly recorded incident.
pub const INITIAL_CONFIDENCE: f64 = 1.0;

/// Confidence added when a stored signature is saved again.
pub const REPEAT_SUCCESS_BONUS: f64 = 1.0;

/// Default penalty applied when a reused fix regresses.
pub const DEFAULT_PENALTY: f64 = 0.5;

/// Default lower bound for penalized confidence.
pub const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.1;
