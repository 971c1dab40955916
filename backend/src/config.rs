use std::str::FromStr;
use shared::tally::DEFAULT_PROMOTION_THRESHOLD;
use tracing::warn;

pub const PROMOTION_THRESHOLD_KEY: &str = "PROMOTION_THRESHOLD";
pub const EVICT_ON_TOGGLE_OFF_KEY: &str = "EVICT_ON_TOGGLE_OFF";
pub const VOTE_RATE_LIMIT_ATTEMPTS_KEY: &str = "VOTE_RATE_LIMIT_ATTEMPTS";
pub const VOTE_RATE_LIMIT_WINDOW_KEY: &str = "VOTE_RATE_LIMIT_WINDOW_MINUTES";

const DEFAULT_VOTE_RATE_LIMIT_ATTEMPTS: u32 = 30;
const DEFAULT_VOTE_RATE_LIMIT_WINDOW_MINUTES: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteConfig {
    /// Minimum score at which a post snapshot is written to the cache.
    pub promotion_threshold: i64,
    /// When set, removing a vote also evicts the post's cached snapshot.
    pub evict_on_toggle_off: bool,
    pub rate_limit_attempts: u32,
    pub rate_limit_window_minutes: i64,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            promotion_threshold: DEFAULT_PROMOTION_THRESHOLD,
            evict_on_toggle_off: false,
            rate_limit_attempts: DEFAULT_VOTE_RATE_LIMIT_ATTEMPTS,
            rate_limit_window_minutes: DEFAULT_VOTE_RATE_LIMIT_WINDOW_MINUTES,
        }
    }
}

impl VoteConfig {
    /// Builds the config from a key lookup such as the shuttle secret store.
    /// Missing keys keep their defaults; unparseable values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            promotion_threshold: parse_or(&lookup, PROMOTION_THRESHOLD_KEY, defaults.promotion_threshold),
            evict_on_toggle_off: parse_or(&lookup, EVICT_ON_TOGGLE_OFF_KEY, defaults.evict_on_toggle_off),
            rate_limit_attempts: parse_or(&lookup, VOTE_RATE_LIMIT_ATTEMPTS_KEY, defaults.rate_limit_attempts).max(1),
            rate_limit_window_minutes: parse_or(&lookup, VOTE_RATE_LIMIT_WINDOW_KEY, defaults.rate_limit_window_minutes).max(1),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Debug,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {} value {:?}, using {:?}", key, raw, default);
            default
        }),
        None => default,
    }
}
