//! Request-scoped outgoing HTTP client decorator.
//!
//! Installed into request extensions by the interceptor for the lifetime of
//! one inbound request; every call issued through it is recorded in the
//! correlation store at dispatch time and finalized with its outcome.

use std::sync::Arc;

use axum::http::Response as HttpResponse;

use crate::mask::MaskEngine;
use crate::trace::{ChildOutcome, RequestTracker};

/// Decorator over `reqwest::Client` that links outgoing calls to the
/// owning inbound request.
///
/// Tracking is strictly observational: the call's outcome is returned to
/// the caller unchanged, and any tracking failure degrades to an untracked
/// call.
#[derive(Clone)]
pub struct TracedClient {
    inner: reqwest::Client,
    tracker: RequestTracker,
    mask: Arc<MaskEngine>,
    main_request_id: String,
}

impl TracedClient {
    /// Scope a decorator to one main request.
    pub fn new(
        inner: reqwest::Client,
        tracker: RequestTracker,
        mask: Arc<MaskEngine>,
        main_request_id: String,
    ) -> Self {
        Self {
            inner,
            tracker,
            mask,
            main_request_id,
        }
    }

    /// The inbound request this client is scoped to.
    pub fn main_request_id(&self) -> &str {
        &self.main_request_id
    }

    /// Build a request through the underlying client.
    ///
    /// The builder is untracked until handed back to [`Self::execute`].
    pub fn request<U: reqwest::IntoUrl>(
        &self,
        method: reqwest::Method,
        url: U,
    ) -> reqwest::RequestBuilder {
        self.inner.request(method, url)
    }

    /// GET `url` with tracking.
    pub async fn get<U: reqwest::IntoUrl>(&self, url: U) -> reqwest::Result<reqwest::Response> {
        let request = self.inner.get(url).build()?;
        self.execute(request).await
    }

    /// POST a JSON payload to `url` with tracking.
    pub async fn post_json<U: reqwest::IntoUrl, T: serde::Serialize + ?Sized>(
        &self,
        url: U,
        json: &T,
    ) -> reqwest::Result<reqwest::Response> {
        let request = self.inner.post(url).json(json).build()?;
        self.execute(request).await
    }

    /// Execute a prepared request, recording dispatch and outcome.
    ///
    /// The response body is buffered so its leading chars can be captured;
    /// the caller receives an equivalent response with the full body.
    pub async fn execute(&self, request: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let method = request.method().to_string();
        let uri = request.url().to_string();
        let headers = self.mask.sanitize_headers(request.headers());

        let child_id = match self
            .tracker
            .track_dispatch(&self.main_request_id, &method, &uri, headers)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                // Store trouble: the call proceeds untracked.
                tracing::debug!(error = %e, %uri, "outgoing dispatch not tracked");
                None
            }
        };

        match self.inner.execute(request).await {
            Ok(response) => {
                let Some(child_id) = child_id else {
                    return Ok(response);
                };
                self.finalize_success(&child_id, response).await
            }
            Err(error) => {
                if let Some(child_id) = child_id {
                    let outcome = ChildOutcome::Failure {
                        error_message: error.to_string(),
                        // Transport errors without an HTTP status count as 500.
                        error_code: error.status().map(|s| s.as_u16()).unwrap_or(500),
                    };
                    if let Err(e) = self.tracker.finalize(&child_id, outcome).await {
                        tracing::debug!(error = %e, %child_id, "outgoing finalize failed");
                    }
                }
                Err(error)
            }
        }
    }

    /// Record a successful response and rebuild it for the caller.
    async fn finalize_success(
        &self,
        child_id: &str,
        response: reqwest::Response,
    ) -> reqwest::Result<reqwest::Response> {
        let status = response.status();
        let headers = response.headers().clone();

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(error) => {
                let outcome = ChildOutcome::Failure {
                    error_message: error.to_string(),
                    error_code: status.as_u16(),
                };
                if let Err(e) = self.tracker.finalize(child_id, outcome).await {
                    tracing::debug!(error = %e, %child_id, "outgoing finalize failed");
                }
                return Err(error);
            }
        };

        let outcome = ChildOutcome::Success {
            status_code: status.as_u16(),
            response_headers: self.mask.sanitize_headers(&headers),
            truncated_body: String::from_utf8_lossy(&bytes).into_owned(),
        };
        if let Err(e) = self.tracker.finalize(child_id, outcome).await {
            tracing::debug!(error = %e, %child_id, "outgoing finalize failed");
        }

        let mut rebuilt = HttpResponse::new(bytes);
        *rebuilt.status_mut() = status;
        *rebuilt.headers_mut() = headers;
        Ok(reqwest::Response::from(rebuilt))
    }
}
