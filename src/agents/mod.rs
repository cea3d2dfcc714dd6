//! Pipeline workers: Preparer, Modeler and Critic.
//!
//! All three implement [`Worker`]; the orchestrator is generic over that
//! trait and never names the concrete types.

pub mod critic;
pub mod error;
pub mod modeler;
pub mod preparer;
pub mod types;
pub mod worker;

pub use critic::{Critic, CritiqueRequest};
pub use error::{WorkerError, WorkerResult};
pub use modeler::{Modeler, ModelingRequest};
pub use preparer::{PreparationRequest, Preparer};
pub use types::{CandidateArtifact, CleanSchema, LeakageRisk, PreparedData, ProblemKind, Verdict};
pub use worker::Worker;
