use serde::{Serialize, Deserialize};
use crate::models::VoteType;

/// Default minimum score at which a post snapshot is written to the fast cache.
pub const DEFAULT_PROMOTION_THRESHOLD: i64 = 1;

/// What a vote request does to the (user, target) vote row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoteTransition {
    Create,
    Update,
    Remove,
}

/// Toggle semantics: a repeated vote in the same direction removes it.
pub const fn transition(existing: Option<VoteType>, requested: VoteType) -> VoteTransition {
    match existing {
        None => VoteTransition::Create,
        Some(VoteType::Up) => match requested {
            VoteType::Up => VoteTransition::Remove,
            VoteType::Down => VoteTransition::Update,
        },
        Some(VoteType::Down) => match requested {
            VoteType::Down => VoteTransition::Remove,
            VoteType::Up => VoteTransition::Update,
        },
    }
}

/// Net score: upvotes minus downvotes over the votes currently on record.
pub fn score<I>(votes: I) -> i64
where
    I: IntoIterator<Item = VoteType>,
{
    votes.into_iter().map(VoteType::weight).sum()
}

pub const fn should_promote(score: i64, threshold: i64) -> bool {
    score >= threshold
}
