///! Element-set catalog: network sources, validation and the freshness cache
///!
///! ## Main Components
///! - `FreshnessCache`: per-group immutable payload files with an age-based reuse policy
///! - `CachePolicy`: storage root, extension, freshness window and validator for one feed
///! - `validate_elements` / `parse_records`: structural checks and record building

mod cache;
pub use cache::{CacheEntry, CachePolicy, FetchOutcome, FreshnessCache, PayloadValidator};

mod source;
pub use source::{FeedSource, HttpFeedSource, NamedObjectSource};

mod validator;
pub use validator::{ElementLayout, validate_elements, validate_json};

mod parser;
pub use parser::{UNKNOWN_NAME, parse_records};

#[cfg(test)]
pub(crate) use cache::tests::{ISS, StubSource};
