pub mod fanout;
pub mod geo;
pub mod insight;
pub mod pipeline;
pub mod relevance;
pub mod scoring;
pub mod service;

pub use pipeline::{FacilityResult, FacilitySearch, SearchRequest, SearchResponse};
pub use relevance::RelevanceAnalyzer;
pub use service::ServiceType;
