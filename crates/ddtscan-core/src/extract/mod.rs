//! Rule-based field extraction for DDT pages.

pub mod page;
pub mod patterns;
pub mod similarity;

pub use page::{PageExtraction, PageFields, PatternExtractor, Rule};
pub use similarity::{resolve_token, similarity_ratio, CrewResolution, SimilarityMatcher};
