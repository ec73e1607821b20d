//! Row types returned by the backend
//!
//! One struct per table, plus the report shapes produced by the analysis
//! edge functions. Timestamps are UTC; identifiers are UUIDs minted by the
//! backend.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tracked website, row of `seo_projects`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeoProject {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A keyword under tracking, row of `seo_keywords`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub id: Uuid,
    pub project_id: Uuid,
    pub keyword: String,
    pub search_volume: u32,
    /// 0-100, higher is harder to rank for
    pub difficulty: u8,
    /// Search intent label, e.g. "informational", "transactional"
    pub intent: Option<String>,
    pub current_position: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// A position measurement, row of `serp_rankings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerpRanking {
    pub id: Uuid,
    pub project_id: Uuid,
    pub keyword_id: Uuid,
    pub position: u32,
    pub url: String,
    pub tracked_at: DateTime<Utc>,
}

/// A competitor snapshot, row of `competitor_analysis`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorEntry {
    pub id: Uuid,
    pub project_id: Uuid,
    pub competitor_domain: String,
    pub authority_score: u32,
    pub common_keywords: u32,
    pub analyzed_at: DateTime<Utc>,
}

/// An inbound link, row of `backlink_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backlink {
    pub id: Uuid,
    pub project_id: Uuid,
    pub source_url: String,
    pub target_url: String,
    pub anchor_text: Option<String>,
    pub domain_authority: u32,
    pub discovered_at: DateTime<Utc>,
}

/// One day of search-console metrics, row of `gsc_analytics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsPoint {
    pub project_id: Uuid,
    pub date: NaiveDate,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub avg_position: f64,
}

/// Result of the `seo-intelligence-analyzer` edge function.
///
/// The scoring itself happens server-side; the client treats the report
/// as mostly opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub project_id: Uuid,
    pub overall_score: u32,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Result of the `competitor-analyzer` edge function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorReport {
    pub project_id: Uuid,
    pub competitor_domain: String,
    pub authority_score: u32,
    pub overlapping_keywords: Vec<String>,
    pub generated_at: DateTime<Utc>,
}
