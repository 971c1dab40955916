pub mod cache;
pub mod catchers;
pub mod config;
pub mod error;
pub mod processor;
pub mod queries;
pub mod rate_limiter;
pub mod routes;
pub mod store;
pub mod utils;
pub use shared::principal;
pub use shared::{models::*, error::{Error, ErrorCode}, principal::Principal};
pub use shared::tally::{VoteTransition, DEFAULT_PROMOTION_THRESHOLD};

#[cfg(test)]
mod tests;
