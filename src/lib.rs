pub mod collaborator;
pub mod config;
pub mod consolidation;
pub mod error;
pub mod matching;
pub mod models;
pub mod pipeline;
pub mod schema;
pub mod store;
pub mod utils;

pub use error::{EngineError, Outcome};
pub use models::{AddressRecord, MatchCandidate, SearchCriteria};
pub use pipeline::{resolve_address, MatchOutcome, ResolutionContext};
