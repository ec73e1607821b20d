//! SerpRank client data layer
//!
//! In-memory TTL cache and cached API client for the SerpRank SEO
//! platform backend. Reads are memoized per resource with prefix-based
//! invalidation on writes; remote failures are classified into a small
//! error taxonomy and reported once before being returned.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod realtime;
pub mod report;

pub use cache::{CacheManager, CacheStats};
pub use client::SeoApiClient;
pub use config::{CacheConfig, ClientConfig};
pub use error::{ApiError, ErrorKind};
pub use realtime::{ChangeEvent, ChangeHub, ChangeKind, Subscription};
pub use report::{ErrorNotice, ErrorReporter, TracingReporter};
