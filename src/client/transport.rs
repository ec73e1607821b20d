//! HTTP transport
//!
//! Wraps every remote call with the cross-cutting request policies: a
//! per-client deadline enforced by cancellation, HTTP-status error
//! classification, and exactly-once reporting to the error sink before
//! the failure is returned to the caller.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::client::Query;
use crate::config::ClientConfig;
use crate::error::{ApiError, ErrorKind, Result};
use crate::report::{ErrorNotice, ErrorReporter};

// == Http Transport ==
/// Shared HTTP layer for table reads/writes and edge function calls.
///
/// The deadline applies to the whole call including body download; when it
/// fires, the in-flight request future is dropped (cancelling the
/// connection) and the caller sees a `Network` timeout error. There is no
/// per-call override and no automatic retry.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
    reporter: Arc<dyn ErrorReporter>,
}

impl HttpTransport {
    // == Constructor ==
    pub fn new(config: &ClientConfig, reporter: Arc<dyn ErrorReporter>) -> Self {
        // Deadlines are enforced around the whole call below, not inside
        // reqwest, so cancellation and classification stay in one place.
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .build()
            .expect("default TLS backend must be available");

        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
            reporter,
        }
    }

    // == Table Reads ==
    /// Fetches matching rows of `table` as a raw JSON array.
    pub async fn get_rows(&self, table: &str, query: &Query) -> Result<Value> {
        self.request(Method::GET, &format!("/rest/v1/{}", table), &query.to_params(), None)
            .await
    }

    // == Table Writes ==
    /// Inserts one or more rows; returns the created rows.
    pub async fn insert_rows<B: Serialize>(&self, table: &str, body: &B) -> Result<Value> {
        let body = serde_json::to_value(body).map_err(ApiError::from)?;
        self.request(Method::POST, &format!("/rest/v1/{}", table), &[], Some(body))
            .await
    }

    /// Patches matching rows; returns the updated rows.
    pub async fn update_rows<B: Serialize>(
        &self,
        table: &str,
        query: &Query,
        body: &B,
    ) -> Result<Value> {
        let body = serde_json::to_value(body).map_err(ApiError::from)?;
        self.request(
            Method::PATCH,
            &format!("/rest/v1/{}", table),
            &query.to_params(),
            Some(body),
        )
        .await
    }

    /// Deletes matching rows.
    pub async fn delete_rows(&self, table: &str, query: &Query) -> Result<()> {
        self.request(
            Method::DELETE,
            &format!("/rest/v1/{}", table),
            &query.to_params(),
            None,
        )
        .await?;
        Ok(())
    }

    // == Edge Functions ==
    /// Invokes a named edge function and unwraps its `{data, error}`
    /// envelope. An envelope-level error means the function rejected the
    /// input and classifies as `Validation`.
    pub async fn invoke_function<B: Serialize, T: DeserializeOwned>(
        &self,
        name: &str,
        body: &B,
    ) -> Result<T> {
        let path = format!("/functions/v1/{}", name);
        let body = serde_json::to_value(body).map_err(ApiError::from)?;
        let envelope = self.request(Method::POST, &path, &[], Some(body)).await?;

        if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
            let message = error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(self.fail(
                ApiError::new(ErrorKind::Validation, message),
                &path,
                "POST",
            ));
        }

        let data = envelope.get("data").cloned().unwrap_or(Value::Null);
        serde_json::from_value(data)
            .map_err(|e| self.fail(ApiError::from(e), &path, "POST"))
    }

    // == Core Request ==
    /// Performs one HTTP call under the client deadline and classifies any
    /// failure. Empty response bodies (e.g. deletes) come back as `Null`.
    async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: Option<Value>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let method_name = method.to_string();
        debug!(%method, %url, "backend request");

        let mut builder = self
            .http
            .request(method, &url)
            .header("apikey", &self.api_key)
            .header("authorization", format!("Bearer {}", self.api_key))
            .query(params);
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let exchange = async {
            let response = builder.send().await.map_err(ApiError::from)?;
            let status = response.status();
            let text = response.text().await.map_err(ApiError::from)?;

            if !status.is_success() {
                return Err(ApiError::from_status(status, text));
            }
            if text.is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&text).map_err(ApiError::from)
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(self.fail(err, path, &method_name)),
            // Deadline fired: the exchange future was dropped, aborting
            // the in-flight call; nothing partial is ever returned
            Err(_) => Err(self.fail(ApiError::timeout(), path, &method_name)),
        }
    }

    /// Attaches context, reports the failure once, and hands the original
    /// error back for propagation.
    fn fail(&self, err: ApiError, endpoint: &str, method: &str) -> ApiError {
        let err = err
            .with_context("endpoint", endpoint)
            .with_context("method", method);
        self.reporter.report(&ErrorNotice::from_error(&err));
        err
    }
}
