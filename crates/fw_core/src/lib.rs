pub mod dates;
pub mod error;
pub mod keywords;
pub mod types;

pub use error::{Error, Result};
pub use keywords::{matched_keywords, KeywordSet};
pub use types::{
    Article, DateConfidence, ErrorResponse, HealthResponse, RawCandidate, SearchResponse,
    SourceId, SourceMetadata, MAX_SUMMARY_CHARS, SUMMARY_PLACEHOLDER,
};
