//! Provider aggregation.
//!
//! The [`Aggregator`] runs one round per protocol family over the enabled
//! providers, using the translator to build queries, the capability cache to
//! keep indexer capabilities current, and the normalizer to produce
//! [`ResultRecord`]s. Failures feed the downgrade logic and the blocklist.

mod aggregator;
mod capabilities;
mod downgrade;
pub mod families;
mod normalize;
mod translator;
mod types;
pub mod xml;

pub use aggregator::{Aggregator, ProviderTestReport};
pub use capabilities::{apply_caps, CapabilityCache};
pub use downgrade::{is_unsupported_error, maybe_disable_search_type};
pub use normalize::{
    age_in_days, normalize_feed_item, normalize_indexer_item, parse_size, within_retention,
    IndexerMode, NormalizeSettings,
};
pub use translator::{build_query, clean_name, search_terms, unaccented, IndexerQuery};
pub use types::*;
