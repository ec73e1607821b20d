//! Mutation payloads and read filters
//!
//! Patch types serialize only the fields being changed; filters know how
//! to render themselves both as query parameters and as a stable fragment
//! for cache keys.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload for creating a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub domain: String,
}

/// Partial update of a project; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// Payload for adding a keyword to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewKeyword {
    pub project_id: Uuid,
    pub keyword: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

/// Partial update of a keyword.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_position: Option<u32>,
}

/// One item of a batch keyword update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordUpdate {
    pub id: Uuid,
    pub patch: KeywordPatch,
}

/// Filter for keyword listings.
///
/// Field order is fixed, so the serialized form is deterministic and two
/// equal filters always derive the same cache key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_volume: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_difficulty: Option<u8>,
}

impl KeywordFilter {
    /// Stable string form for embedding in a cache key.
    pub fn cache_fragment(&self) -> String {
        serde_json::to_string(self).expect("filter serialization cannot fail")
    }
}

/// Options forwarded to the SEO analysis edge function.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_competitors: Option<bool>,
}
