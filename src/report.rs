//! Error reporting sink
//!
//! The request layer reports every classified failure exactly once at the
//! point where it occurs, then returns the error to the caller unchanged.
//! The sink behind the [`ErrorReporter`] seam is a presentation concern:
//! the default implementation logs through `tracing`, an embedding UI can
//! substitute a toast/notification dispatcher or a monitoring forwarder.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::{ApiError, ErrorKind};

// == Error Notice ==
/// What the sink receives for each classified failure.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorNotice {
    /// Short user-facing message for the notification surface
    pub message: String,
    /// Classification of the underlying failure
    #[serde(serialize_with = "serialize_kind")]
    pub kind: ErrorKind,
    /// Diagnostic context copied from the error
    pub context: BTreeMap<String, String>,
    /// When the failure was observed
    pub timestamp: DateTime<Utc>,
}

fn serialize_kind<S: serde::Serializer>(kind: &ErrorKind, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&kind.to_string())
}

impl ErrorNotice {
    /// Builds a notice from a classified error, stamped with the current time.
    pub fn from_error(err: &ApiError) -> Self {
        Self {
            message: err.kind.user_message().to_string(),
            kind: err.kind,
            context: err.context.clone(),
            timestamp: Utc::now(),
        }
    }
}

// == Error Reporter ==
/// Destination for classified error notices.
///
/// Implementations must not fail; reporting is a best-effort side effect
/// and never changes what the caller sees.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, notice: &ErrorNotice);
}

// == Tracing Reporter ==
/// Default reporter that writes notices to the `tracing` log.
///
/// Blocking failures log at error level, rate limits at warn.
#[derive(Debug, Default, Clone)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, notice: &ErrorNotice) {
        if notice.kind.is_blocking() {
            error!(
                kind = %notice.kind,
                context = ?notice.context,
                "{}",
                notice.message
            );
        } else {
            warn!(
                kind = %notice.kind,
                context = ?notice.context,
                "{}",
                notice.message
            );
        }
    }
}
