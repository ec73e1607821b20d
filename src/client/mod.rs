//! Request layer
//!
//! The HTTP transport, the table query builder, and the typed API client
//! that ties caching and invalidation to each backend operation.

mod api;
mod query;
mod transport;

// Re-export public types
pub use api::SeoApiClient;
pub use query::Query;
pub use transport::HttpTransport;
