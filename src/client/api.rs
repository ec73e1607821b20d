//! SEO platform API client
//!
//! Typed operations over the backend's tables and edge functions. Every
//! read is memoized through the injected [`CacheManager`] under a
//! deterministic key with a per-resource TTL; every write performs the
//! mutation first and only invalidates cached views once the backend has
//! accepted it. Failed mutations leave the cache untouched.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use crate::cache::CacheManager;
use crate::client::{HttpTransport, Query};
use crate::config::ClientConfig;
use crate::error::{ApiError, ErrorKind, Result};
use crate::models::{
    AnalysisOptions, AnalysisReport, AnalyticsPoint, Backlink, CompetitorEntry, CompetitorReport,
    Keyword, KeywordFilter, KeywordPatch, KeywordUpdate, NewKeyword, NewProject, ProjectPatch,
    SeoProject, SerpRanking,
};
use crate::realtime::{ChangeEvent, ChangeHub, Subscription};
use crate::report::{ErrorReporter, TracingReporter};

// == Per-Resource TTLs ==
// Keyword listings churn with every tracked-position refresh; backlink
// discovery moves on the order of hours.
const PROJECTS_TTL: Duration = Duration::from_secs(5 * 60);
const KEYWORDS_TTL: Duration = Duration::from_secs(2 * 60);
const RANKINGS_TTL: Duration = Duration::from_secs(5 * 60);
const COMPETITORS_TTL: Duration = Duration::from_secs(10 * 60);
const BACKLINKS_TTL: Duration = Duration::from_secs(30 * 60);
const ANALYTICS_TTL: Duration = Duration::from_secs(10 * 60);

// == Seo Api Client ==
/// Client for the SerpRank backend.
///
/// Holds a transport, a cache, and a realtime hub by composition; all
/// three can be shared across clients, and cloning the client is cheap.
#[derive(Clone)]
pub struct SeoApiClient {
    transport: Arc<HttpTransport>,
    cache: CacheManager<Value>,
    hub: Arc<ChangeHub>,
}

impl SeoApiClient {
    // == Constructors ==
    /// Creates a client reporting errors through `tracing`.
    pub fn new(config: &ClientConfig, cache: CacheManager<Value>, hub: Arc<ChangeHub>) -> Self {
        Self::with_reporter(config, cache, hub, Arc::new(TracingReporter))
    }

    /// Creates a client with a custom error sink.
    pub fn with_reporter(
        config: &ClientConfig,
        cache: CacheManager<Value>,
        hub: Arc<ChangeHub>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            transport: Arc::new(HttpTransport::new(config, reporter)),
            cache,
            hub,
        }
    }

    /// The cache instance backing this client's reads.
    pub fn cache(&self) -> &CacheManager<Value> {
        &self.cache
    }

    /// The realtime hub this client listens on.
    pub fn hub(&self) -> &Arc<ChangeHub> {
        &self.hub
    }

    // == Projects ==
    pub async fn list_projects(&self) -> Result<Vec<SeoProject>> {
        let query = Query::new().order("created_at", true);
        self.cached_rows("projects", PROJECTS_TTL, "seo_projects", query)
            .await
    }

    pub async fn get_project(&self, id: Uuid) -> Result<SeoProject> {
        let key = project_key(id);
        let transport = self.transport.clone();
        let raw = self
            .cache
            .get_or_set(&key, Some(PROJECTS_TTL), move || async move {
                transport
                    .get_rows("seo_projects", &Query::new().eq("id", id))
                    .await
            })
            .await?;
        first_row(raw)
    }

    pub async fn create_project(&self, new: &NewProject) -> Result<SeoProject> {
        let created = self.transport.insert_rows("seo_projects", &[new]).await?;
        let project: SeoProject = first_row(created)?;
        self.cache.invalidate_prefix("projects").await;
        Ok(project)
    }

    pub async fn update_project(&self, id: Uuid, patch: &ProjectPatch) -> Result<SeoProject> {
        let updated = self
            .transport
            .update_rows("seo_projects", &Query::new().eq("id", id), patch)
            .await?;
        let project: SeoProject = first_row(updated)?;

        self.cache.delete(&project_key(id)).await;
        self.cache.invalidate_prefix("projects").await;
        Ok(project)
    }

    /// Deletes a project and drops every cached view scoped to it.
    pub async fn delete_project(&self, id: Uuid) -> Result<()> {
        self.transport
            .delete_rows("seo_projects", &Query::new().eq("id", id))
            .await?;

        self.cache.delete(&project_key(id)).await;
        self.cache.invalidate_prefix("projects").await;
        self.cache.invalidate_pattern(&project_scoped_pattern(id)).await;
        Ok(())
    }

    // == Keywords ==
    pub async fn list_keywords(
        &self,
        project_id: Uuid,
        filter: &KeywordFilter,
    ) -> Result<Vec<Keyword>> {
        let key = format!(
            "{}:{}",
            keywords_prefix(project_id),
            filter.cache_fragment()
        );
        let query = keyword_query(project_id, filter);
        self.cached_rows(&key, KEYWORDS_TTL, "seo_keywords", query)
            .await
    }

    pub async fn add_keyword(&self, new: &NewKeyword) -> Result<Keyword> {
        let created = self.transport.insert_rows("seo_keywords", &[new]).await?;
        let keyword: Keyword = first_row(created)?;
        self.cache
            .invalidate_prefix(&keywords_prefix(new.project_id))
            .await;
        Ok(keyword)
    }

    pub async fn update_keyword(
        &self,
        project_id: Uuid,
        keyword_id: Uuid,
        patch: &KeywordPatch,
    ) -> Result<Keyword> {
        let updated = self
            .transport
            .update_rows("seo_keywords", &Query::new().eq("id", keyword_id), patch)
            .await?;
        let keyword: Keyword = first_row(updated)?;
        self.cache
            .invalidate_prefix(&keywords_prefix(project_id))
            .await;
        Ok(keyword)
    }

    pub async fn delete_keyword(&self, project_id: Uuid, keyword_id: Uuid) -> Result<()> {
        self.transport
            .delete_rows("seo_keywords", &Query::new().eq("id", keyword_id))
            .await?;
        self.cache
            .invalidate_prefix(&keywords_prefix(project_id))
            .await;
        Ok(())
    }

    /// Adds a batch of keywords in one backend call.
    ///
    /// Atomic: either every row is created or the whole call fails, and
    /// cached keyword views are invalidated exactly once.
    pub async fn batch_add_keywords(
        &self,
        project_id: Uuid,
        items: &[NewKeyword],
    ) -> Result<Vec<Keyword>> {
        let created = self.transport.insert_rows("seo_keywords", &items).await?;
        let keywords: Vec<Keyword> = rows_from(created)?;
        self.cache
            .invalidate_prefix(&keywords_prefix(project_id))
            .await;
        Ok(keywords)
    }

    /// Applies each update independently and reports per-item outcomes.
    ///
    /// A failing item never aborts the rest; callers inspect the returned
    /// results to decide what to retry.
    pub async fn batch_update_keywords(
        &self,
        project_id: Uuid,
        updates: &[KeywordUpdate],
    ) -> Vec<Result<Keyword>> {
        let tasks = updates
            .iter()
            .map(|update| self.update_keyword(project_id, update.id, &update.patch));
        futures::future::join_all(tasks).await
    }

    // == Rankings ==
    pub async fn get_serp_rankings(&self, project_id: Uuid) -> Result<Vec<SerpRanking>> {
        let key = format!("rankings:{}", project_id);
        let query = Query::new()
            .eq("project_id", project_id)
            .order("tracked_at", true);
        self.cached_rows(&key, RANKINGS_TTL, "serp_rankings", query)
            .await
    }

    // == Competitors ==
    pub async fn list_competitors(&self, project_id: Uuid) -> Result<Vec<CompetitorEntry>> {
        let key = competitors_prefix(project_id);
        let query = Query::new()
            .eq("project_id", project_id)
            .order("analyzed_at", true);
        self.cached_rows(&key, COMPETITORS_TTL, "competitor_analysis", query)
            .await
    }

    /// Runs the competitor analysis function.
    ///
    /// The function stores its findings server-side, so cached competitor
    /// listings are stale the moment it succeeds and are dropped here.
    pub async fn analyze_competitor(
        &self,
        project_id: Uuid,
        competitor_domain: &str,
    ) -> Result<CompetitorReport> {
        let report: CompetitorReport = self
            .transport
            .invoke_function(
                "competitor-analyzer",
                &json!({
                    "project_id": project_id,
                    "competitor_domain": competitor_domain,
                }),
            )
            .await?;
        self.cache
            .invalidate_prefix(&competitors_prefix(project_id))
            .await;
        Ok(report)
    }

    // == Backlinks ==
    pub async fn list_backlinks(&self, project_id: Uuid) -> Result<Vec<Backlink>> {
        let key = format!("backlinks:{}", project_id);
        let query = Query::new()
            .eq("project_id", project_id)
            .order("discovered_at", true);
        self.cached_rows(&key, BACKLINKS_TTL, "backlink_data", query)
            .await
    }

    // == Analytics ==
    pub async fn get_analytics(
        &self,
        project_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AnalyticsPoint>> {
        let key = format!("analytics:{}:{}:{}", project_id, from, to);
        let query = Query::new()
            .eq("project_id", project_id)
            .gte("date", from)
            .lte("date", to)
            .order("date", false);
        self.cached_rows(&key, ANALYTICS_TTL, "gsc_analytics", query)
            .await
    }

    // == Analysis ==
    /// Runs the full-site SEO analysis function. Compute invocation, not a
    /// cached read.
    pub async fn run_seo_analysis(
        &self,
        project_id: Uuid,
        options: &AnalysisOptions,
    ) -> Result<AnalysisReport> {
        self.transport
            .invoke_function(
                "seo-intelligence-analyzer",
                &json!({
                    "project_id": project_id,
                    "options": options,
                }),
            )
            .await
    }

    // == Realtime ==
    /// Listens for keyword changes in one project.
    ///
    /// For every event, the cached keyword views of the project are
    /// invalidated before the callback runs.
    pub fn subscribe_keyword_changes(
        &self,
        project_id: Uuid,
        callback: impl Fn(ChangeEvent) + Send + 'static,
    ) -> Subscription {
        self.subscribe_table(
            "seo_keywords",
            keywords_prefix(project_id),
            Some(project_id),
            callback,
        )
    }

    /// Listens for changes to any project row.
    pub fn subscribe_project_changes(
        &self,
        callback: impl Fn(ChangeEvent) + Send + 'static,
    ) -> Subscription {
        // "project" covers both the listing key and per-project keys
        self.subscribe_table("seo_projects", "project".to_string(), None, callback)
    }

    fn subscribe_table(
        &self,
        table: &str,
        prefix: String,
        project_filter: Option<Uuid>,
        callback: impl Fn(ChangeEvent) + Send + 'static,
    ) -> Subscription {
        let mut rx = self.hub.subscribe(table);
        let cache = self.cache.clone();
        let project_filter = project_filter.map(|id| id.to_string());

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Some(wanted) = &project_filter {
                            let matches = event
                                .row()
                                .and_then(|row| row.get("project_id"))
                                .and_then(Value::as_str)
                                .map(|pid| pid == wanted)
                                .unwrap_or(false);
                            if !matches {
                                continue;
                            }
                        }
                        // Invalidate before forwarding, so a read-through
                        // triggered by the callback sees fresh data
                        cache.invalidate_prefix(&prefix).await;
                        callback(event);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Events were lost; the cached views can no longer
                        // be trusted
                        warn!(skipped, prefix = %prefix, "change stream lagged");
                        cache.invalidate_prefix(&prefix).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Subscription::new(handle)
    }

    // == Read-Through Helper ==
    async fn cached_rows<T: DeserializeOwned>(
        &self,
        key: &str,
        ttl: Duration,
        table: &str,
        query: Query,
    ) -> Result<Vec<T>> {
        let transport = self.transport.clone();
        let raw = self
            .cache
            .get_or_set(key, Some(ttl), move || async move {
                transport.get_rows(table, &query).await
            })
            .await?;
        rows_from(raw)
    }
}

// == Cache Keys ==
fn project_key(id: Uuid) -> String {
    format!("project:{}", id)
}

fn keywords_prefix(project_id: Uuid) -> String {
    format!("keywords:{}", project_id)
}

fn competitors_prefix(project_id: Uuid) -> String {
    format!("competitors:{}", project_id)
}

/// Matches every cached view scoped to one project.
fn project_scoped_pattern(id: Uuid) -> Regex {
    Regex::new(&format!(
        "^(keywords|rankings|competitors|backlinks|analytics):{}(:|$)",
        id
    ))
    .expect("static pattern is valid")
}

fn keyword_query(project_id: Uuid, filter: &KeywordFilter) -> Query {
    let mut query = Query::new().eq("project_id", project_id);
    if let Some(search) = &filter.search {
        query = query.contains("keyword", search);
    }
    if let Some(intent) = &filter.intent {
        query = query.eq("intent", intent);
    }
    if let Some(min_volume) = filter.min_volume {
        query = query.gte("search_volume", min_volume);
    }
    if let Some(max_difficulty) = filter.max_difficulty {
        query = query.lte("difficulty", max_difficulty);
    }
    query.order("created_at", true)
}

// == Row Extraction ==
fn rows_from<T: DeserializeOwned>(value: Value) -> Result<Vec<T>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value).map_err(ApiError::from)
}

fn first_row<T: DeserializeOwned>(value: Value) -> Result<T> {
    match value {
        Value::Array(mut rows) if !rows.is_empty() => {
            serde_json::from_value(rows.swap_remove(0)).map_err(ApiError::from)
        }
        _ => Err(ApiError::new(ErrorKind::Unknown, "row not found")),
    }
}
