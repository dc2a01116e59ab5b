//! Document fetching and parsing seams.

use crate::dom::{self, Document};
use crate::error::{PageError, PageResult};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Response to a document or resource fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// HTTP status text.
    pub status_text: String,
    /// The response body as text.
    pub response_text: String,
}

impl FetchResponse {
    /// Create a response.
    #[must_use]
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            response_text: body.into(),
        }
    }

    /// Whether the status is a success status.
    #[must_use]
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Type alias for boxed fetch futures.
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = PageResult<FetchResponse>> + Send + 'a>>;

/// The GET-with-timeout collaborator used for document loads and
/// resource preloading.
pub trait Fetcher: Send + Sync {
    /// Fetch a URL with a bounded timeout.
    ///
    /// Timeouts and transport failures surface as
    /// [`PageError::RouterFetch`]; HTTP error statuses are returned as
    /// responses, not errors: status handling belongs to the caller.
    fn get(&self, url: &str, timeout_ms: u64) -> FetchFuture<'_>;
}

/// Production fetcher on the hyper client stack.
#[derive(Debug, Clone, Default)]
pub struct HyperFetcher;

impl HyperFetcher {
    /// Create a new fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Fetcher for HyperFetcher {
    fn get(&self, url: &str, timeout_ms: u64) -> FetchFuture<'_> {
        let url = url.to_string();

        Box::pin(async move {
            use bytes::Bytes;
            use http_body_util::{BodyExt, Full};
            use hyper::{Method, Request};
            use hyper_util::client::legacy::Client;
            use hyper_util::rt::TokioExecutor;

            let uri = url
                .parse::<hyper::Uri>()
                .map_err(|e| PageError::RouterFetch {
                    url: url.clone(),
                    cause: format!("invalid URL: {}", e),
                })?;

            let request = Request::builder()
                .method(Method::GET)
                .uri(uri)
                .body(Full::new(Bytes::new()))
                .map_err(|e| PageError::RouterFetch {
                    url: url.clone(),
                    cause: format!("failed to build request: {}", e),
                })?;

            let client = Client::builder(TokioExecutor::new()).build_http();

            let timeout = Duration::from_millis(timeout_ms);
            let response = tokio::time::timeout(timeout, client.request(request))
                .await
                .map_err(|_| PageError::RouterFetch {
                    url: url.clone(),
                    cause: format!("timed out after {}ms", timeout_ms),
                })?
                .map_err(|e| PageError::RouterFetch {
                    url: url.clone(),
                    cause: e.to_string(),
                })?;

            let status = response.status().as_u16();
            let status_text = response
                .status()
                .canonical_reason()
                .unwrap_or_default()
                .to_string();

            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| PageError::RouterFetch {
                    url: url.clone(),
                    cause: format!("failed to read response body: {}", e),
                })?
                .to_bytes();

            Ok(FetchResponse {
                status,
                status_text,
                response_text: String::from_utf8_lossy(&body).into_owned(),
            })
        })
    }
}

/// Builds a document from fetched HTML text.
pub trait DocumentBuilder: Send + Sync {
    /// Parse HTML into a document.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::DocumentParse`] when the text yields no
    /// document.
    fn parse_document(&self, html: &str) -> PageResult<Document>;
}

/// The default document builder, backed by the crate's HTML parser.
#[derive(Debug, Clone, Default)]
pub struct HtmlDocumentBuilder;

impl HtmlDocumentBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DocumentBuilder for HtmlDocumentBuilder {
    fn parse_document(&self, html: &str) -> PageResult<Document> {
        dom::parse(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_ok_range() {
        assert!(FetchResponse::new(200, "OK", "").ok());
        assert!(FetchResponse::new(204, "No Content", "").ok());
        assert!(!FetchResponse::new(304, "Not Modified", "").ok());
        assert!(!FetchResponse::new(404, "Not Found", "").ok());
    }

    #[test]
    fn html_builder_parses() {
        let builder = HtmlDocumentBuilder::new();
        let doc = builder
            .parse_document("<html><body><p>hi</p></body></html>")
            .unwrap();
        assert_eq!(doc.body().child_elements().len(), 1);
        assert!(builder.parse_document("").is_err());
    }
}
