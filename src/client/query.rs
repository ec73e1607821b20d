//! Table query builder
//!
//! Small filter/order/range builder matching the backend's REST query
//! semantics. A query renders in two directions: as request parameters,
//! and as a deterministic fragment for cache keys.

// == Query ==
/// Filters, ordering, and paging for a table read.
#[derive(Debug, Clone, Default)]
pub struct Query {
    filters: Vec<(String, String)>,
    order: Option<(String, bool)>,
    range: Option<(u32, u32)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact-match filter on a column.
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    /// Greater-or-equal filter on a column.
    pub fn gte(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), format!("gte.{}", value.to_string())));
        self
    }

    /// Less-or-equal filter on a column.
    pub fn lte(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), format!("lte.{}", value.to_string())));
        self
    }

    /// Case-insensitive substring match on a column.
    pub fn contains(mut self, column: &str, value: &str) -> Self {
        self.filters.push((column.to_string(), format!("ilike.*{}*", value)));
        self
    }

    /// Sort by a column.
    pub fn order(mut self, column: &str, descending: bool) -> Self {
        self.order = Some((column.to_string(), descending));
        self
    }

    /// Inclusive row range for paging.
    pub fn range(mut self, from: u32, to: u32) -> Self {
        self.range = Some((from, to));
        self
    }

    /// Renders the query as request parameters.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = self.filters.clone();
        if let Some((column, descending)) = &self.order {
            let direction = if *descending { "desc" } else { "asc" };
            params.push(("order".to_string(), format!("{}.{}", column, direction)));
        }
        if let Some((from, to)) = self.range {
            params.push(("offset".to_string(), from.to_string()));
            params.push(("limit".to_string(), (to.saturating_sub(from) + 1).to_string()));
        }
        params
    }

    /// Stable string form for embedding in a cache key.
    ///
    /// Filters are sorted so that two queries describing the same
    /// conditions derive the same key regardless of construction order.
    pub fn cache_fragment(&self) -> String {
        let mut parts: Vec<String> = self
            .to_params()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        parts.sort();
        parts.join("&")
    }
}
