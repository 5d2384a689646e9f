//! Shared building blocks for the Liga conversational query engine:
//! identifiers, configuration, the top-level error, and text normalization.

pub mod config;
pub mod error;
pub mod text;
pub mod types;

pub use config::LigaConfig;
pub use error::{LigaError, Result};
pub use types::{PlanId, SessionState, UserId};
