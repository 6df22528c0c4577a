//! Remote platform HTTP client
//!
//! Fetches one page of a named resource, trying candidate base URLs in order
//! until one answers with a 2xx. The client keeps no pagination state; the
//! orchestrator owns that.

use crate::resolver::EndpointCandidate;
use crate::{Result, SyncError};
use mirror_common::sanitizer::LogSanitizer;
use mirror_common::ResourceKind;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// One page of remote records plus pagination metadata
#[derive(Debug, Clone)]
pub struct Page {
    pub records: Vec<Value>,
    /// `None` means the response carried no recognizable pagination metadata,
    /// which marks this page as the final one
    pub meta: Option<PageMeta>,
}

/// Normalized pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub page: u32,
    pub total_pages: u32,
    pub total_count: u64,
}

/// HTTP client for the remote platform's resource endpoints
pub struct RemoteClient {
    http: reqwest::Client,
    per_page: u32,
}

impl RemoteClient {
    /// Build a client with a fixed per-attempt timeout
    pub fn new(request_timeout: Duration, per_page: u32) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self { http, per_page })
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Fetch one page (1-based), falling through candidates in order
    ///
    /// The first 2xx response wins and remaining candidates are not tried.
    /// Non-2xx statuses and transport errors advance to the next candidate;
    /// exhausting the list yields `AllEndpointsExhausted` carrying the last
    /// observed failure.
    pub async fn fetch_page(
        &self,
        resource: ResourceKind,
        endpoints: &[EndpointCandidate],
        token: &str,
        page: u32,
    ) -> Result<Page> {
        // Transport errors can echo request context, token included
        let sanitizer = LogSanitizer::new();
        let mut attempts = 0;
        let mut last_error = "no endpoint candidates".to_string();

        for candidate in endpoints {
            attempts += 1;
            let url = format!(
                "{}/{}",
                candidate.base_url.trim_end_matches('/'),
                resource.path()
            );

            let mut request = self
                .http
                .get(&url)
                .bearer_auth(token)
                .query(&candidate.query)
                .query(&[("page", page.to_string()), ("per_page", self.per_page.to_string())]);

            // Drafts and deleted products are not mirrored
            if resource == ResourceKind::Products {
                request = request.query(&[("status", "active")]);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(%url, page, "Page fetch succeeded");
                    let body: Value = response
                        .json()
                        .await
                        .map_err(|e| SyncError::InvalidResponse(e.to_string()))?;
                    return Ok(parse_page(&body, resource, self.per_page));
                }
                Ok(response) => {
                    last_error = format!("{} returned status {}", url, response.status());
                    warn!(%url, status = %response.status(), "Endpoint candidate rejected request");
                }
                Err(e) => {
                    last_error = sanitizer.sanitize(&format!("{}: {}", url, e));
                    warn!(%url, error = %last_error, "Endpoint candidate unreachable");
                }
            }
        }

        Err(SyncError::AllEndpointsExhausted {
            resource,
            page,
            attempts,
            last_error,
        })
    }
}

/// Extract records and pagination metadata from a response body
pub fn parse_page(body: &Value, resource: ResourceKind, per_page: u32) -> Page {
    let records = body
        .get(resource.items_key())
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let meta = body.get("meta").and_then(|meta| parse_meta(meta, per_page));

    Page { records, meta }
}

/// Interpret the two accepted metadata shapes
///
/// Explicit: `{page, per_page, total_pages, total_count}`. Fallback:
/// `{current_page, total_count}`, deriving total pages from the requested
/// page size. Anything else means no further pages.
fn parse_meta(meta: &Value, per_page: u32) -> Option<PageMeta> {
    if let (Some(page), Some(total_pages)) = (
        meta.get("page").and_then(Value::as_u64),
        meta.get("total_pages").and_then(Value::as_u64),
    ) {
        let total_count = meta.get("total_count").and_then(Value::as_u64).unwrap_or(0);
        return Some(PageMeta {
            page: page as u32,
            total_pages: total_pages as u32,
            total_count,
        });
    }

    if let (Some(current_page), Some(total_count)) = (
        meta.get("current_page").and_then(Value::as_u64),
        meta.get("total_count").and_then(Value::as_u64),
    ) {
        let per_page = per_page.max(1) as u64;
        let total_pages = total_count.div_ceil(per_page);
        return Some(PageMeta {
            page: current_page as u32,
            total_pages: total_pages as u32,
            total_count,
        });
    }

    None
}
