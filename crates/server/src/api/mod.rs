pub mod blocklist;
pub mod handlers;
pub mod middleware;
pub mod providers;
pub mod routes;
pub mod search;

pub use routes::create_router;
