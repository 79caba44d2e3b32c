//! Cache domain - entries, keys, configuration and statistics

mod config;
mod entry;
mod index;
mod key;
mod outcome;
mod stats;

pub use config::{CacheConfig, CacheStrategy};
pub use entry::CacheEntry;
pub use index::{SemanticIndex, SemanticMatch};
pub use key::{CacheKey, CacheKeyNormalizer};
pub use outcome::{CacheOutcome, HitSource};
pub use stats::{CacheStatistics, StatisticsSnapshot};
