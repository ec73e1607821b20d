//! Data models for the SerpRank backend
//!
//! Typed views of the backend tables and the request payloads the client
//! sends to mutate them. The wire format is JSON throughout; rows carry
//! whatever columns the backend returns and tolerate extras.

pub mod payloads;
pub mod rows;

// Re-export commonly used types
pub use payloads::{
    AnalysisOptions, KeywordFilter, KeywordPatch, KeywordUpdate, NewKeyword, NewProject,
    ProjectPatch,
};
pub use rows::{
    AnalysisReport, AnalyticsPoint, Backlink, CompetitorEntry, CompetitorReport, Keyword,
    SeoProject, SerpRanking,
};
