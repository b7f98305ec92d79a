//! Riskgate service: scheduled reconciliation plus manual trigger endpoints.

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod router;
pub mod scheduler;
pub mod state;

pub use config::{Config, ConfigError};
pub use router::create_router;
pub use state::AppState;
