//! Routing: producing the next document for a navigation.

use crate::state::NavigationState;
use pageflow_core::address;
use pageflow_core::dom::Document;
use pageflow_core::traits::{DocumentBuilder, Fetcher, PageHost};
use pageflow_core::{PageError, PageResult};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for boxed route futures.
pub type RouteFuture<'a> = Pin<Box<dyn Future<Output = PageResult<Option<Document>>> + Send + 'a>>;

/// Produces the document for a navigation state.
///
/// `Ok(None)` means "keep the live document": the run proceeds with a
/// same-document stage replay. A router may also abandon the flow with
/// [`PageError::Redirect`], which suppresses the error stage.
pub trait Router: Send + Sync {
    /// Obtain the next document for the state being navigated to.
    fn route(&self, state: &Arc<NavigationState>) -> RouteFuture<'_>;
}

/// The default router: fetch the formatted address over the network.
///
/// Disabled after a non-prerendered referrer: on a first (already
/// rendered) load there is nothing to fetch, and applications that want
/// network routing on every navigation plug in their own router.
pub struct DefaultRouter {
    host: Arc<dyn PageHost>,
    fetcher: Arc<dyn Fetcher>,
    builder: Arc<dyn DocumentBuilder>,
    timeout_ms: u64,
}

impl DefaultRouter {
    /// Create a default router.
    #[must_use]
    pub fn new(
        host: Arc<dyn PageHost>,
        fetcher: Arc<dyn Fetcher>,
        builder: Arc<dyn DocumentBuilder>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            host,
            fetcher,
            builder,
            timeout_ms,
        }
    }
}

impl Router for DefaultRouter {
    fn route(&self, state: &Arc<NavigationState>) -> RouteFuture<'_> {
        let state = Arc::clone(state);
        Box::pin(async move {
            let prerendered = state
                .referrer()
                .and_then(|refer| refer.prerender())
                .unwrap_or(false);
            if !prerendered {
                tracing::debug!("default router disabled after non-prerendered referrer");
                return Ok(None);
            }

            let base = self.host.location();
            let url = address::format(state.address(), &base);
            let client = self.fetcher.get(&url, self.timeout_ms).await?;

            match self.builder.parse_document(&client.response_text) {
                Ok(doc) => {
                    if client.status >= 400 && doc.body().child_elements().is_empty() {
                        return Err(PageError::EmptyDocument {
                            url,
                            status: client.status,
                            status_text: client.status_text,
                        });
                    }
                    tracing::debug!(url = %url, status = client.status, "routed document");
                    Ok(Some(doc))
                }
                Err(err) => {
                    // Cannot work with the payload: leave the in-page
                    // flow and let the browser load it for real.
                    tracing::warn!(url = %url, error = %err, "cannot parse remote document, redirecting");
                    self.host.assign_location(&url);
                    Err(PageError::DocumentParse {
                        url,
                        cause: err.to_string(),
                    })
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pageflow_core::testing::{MemoryHost, MockFetch};
    use pageflow_core::traits::HtmlDocumentBuilder;
    use url::Url;

    fn state_with_referrer(path: &str, prerendered: Option<bool>) -> Arc<NavigationState> {
        let base = Url::parse("https://example.com/").unwrap();
        let state = Arc::new(NavigationState::from_address(
            address::parse(path, &base).unwrap(),
        ));
        let refer = Arc::new(NavigationState::detached());
        refer.set_prerender(prerendered);
        state.set_referrer(refer);
        state
    }

    fn router(host: &MemoryHost, fetch: MockFetch) -> DefaultRouter {
        DefaultRouter::new(
            Arc::new(host.clone()),
            Arc::new(fetch),
            Arc::new(HtmlDocumentBuilder::new()),
            500,
        )
    }

    #[tokio::test]
    async fn disabled_after_non_prerendered_referrer() {
        let host = MemoryHost::new("https://example.com/");
        let fetch = MockFetch::new();
        let router = router(&host, fetch);

        let state = state_with_referrer("/next", Some(false));
        let doc = router.route(&state).await.unwrap();
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn fetches_and_parses_after_prerendered_referrer() {
        let host = MemoryHost::new("https://example.com/");
        let fetch = MockFetch::new()
            .on(r"^/next$")
            .respond_html(200, "<html><body><h1>Next</h1></body></html>");
        let router = router(&host, fetch);

        let state = state_with_referrer("/next", Some(true));
        let doc = router.route(&state).await.unwrap().unwrap();
        assert_eq!(doc.body().child_elements()[0].tag(), "h1");
    }

    #[tokio::test]
    async fn error_status_with_empty_body_is_router_error() {
        let host = MemoryHost::new("https://example.com/");
        let fetch = MockFetch::new()
            .on(r"^/missing$")
            .respond_html(404, "<html><body></body></html>");
        let router = router(&host, fetch);

        let state = state_with_referrer("/missing", Some(true));
        let err = router.route(&state).await.unwrap_err();
        assert_eq!(err.code(), "E203");
    }

    #[tokio::test]
    async fn error_status_with_content_still_loads() {
        let host = MemoryHost::new("https://example.com/");
        let fetch = MockFetch::new()
            .on(r"^/custom-404$")
            .respond_html(404, "<html><body><h1>Lost?</h1></body></html>");
        let router = router(&host, fetch);

        let state = state_with_referrer("/custom-404", Some(true));
        let doc = router.route(&state).await.unwrap();
        assert!(doc.is_some());
    }

    #[tokio::test]
    async fn unparseable_payload_redirects_for_real() {
        let host = MemoryHost::new("https://example.com/");
        let fetch = MockFetch::new().on(r"^/binary$").respond_html(200, "   ");
        let router = router(&host, fetch);

        let state = state_with_referrer("/binary", Some(true));
        let err = router.route(&state).await.unwrap_err();
        assert_eq!(err.code(), "E204");
        assert_eq!(host.assigned_locations(), vec!["/binary".to_string()]);
    }
}
