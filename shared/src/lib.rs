pub mod error;
pub mod models;
pub mod validation;
pub mod principal;
pub mod tally;

pub use error::{Error, ErrorCode, Result};
pub use models::*;
pub use validation::*;
pub use principal::*;
pub use tally::{VoteTransition, DEFAULT_PROMOTION_THRESHOLD, score, should_promote, transition};
