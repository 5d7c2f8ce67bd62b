//! HTTP front end for the shelfscout provider aggregator.

pub mod api;
pub mod metrics;
pub mod state;

pub use api::create_router;
pub use state::AppState;
