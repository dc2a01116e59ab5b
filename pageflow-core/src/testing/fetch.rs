//! Rule-based mock fetcher.

use crate::error::PageError;
use crate::traits::{FetchFuture, FetchResponse, Fetcher};
use parking_lot::RwLock;
use regex::Regex;
use std::time::Duration;

/// One recorded fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// The requested URL.
    pub url: String,
    /// The timeout the caller asked for.
    pub timeout_ms: u64,
}

/// A rule matching fetch URLs and producing a canned outcome.
pub struct MockFetchRule {
    url_pattern: Regex,
    outcome: Result<FetchResponse, String>,
    latency: Option<Duration>,
    times: Option<usize>,
    matched_count: usize,
}

impl MockFetchRule {
    /// Create a rule answering with a response.
    ///
    /// # Panics
    ///
    /// Panics when the URL pattern is not a valid regex.
    #[must_use]
    pub fn new(url_pattern: &str, response: FetchResponse) -> Self {
        Self {
            url_pattern: Regex::new(url_pattern).expect("invalid URL regex pattern"),
            outcome: Ok(response),
            latency: None,
            times: None,
            matched_count: 0,
        }
    }

    /// Create a rule that fails at the transport level.
    ///
    /// # Panics
    ///
    /// Panics when the URL pattern is not a valid regex.
    #[must_use]
    pub fn failing(url_pattern: &str, cause: impl Into<String>) -> Self {
        Self {
            url_pattern: Regex::new(url_pattern).expect("invalid URL regex pattern"),
            outcome: Err(cause.into()),
            latency: None,
            times: None,
            matched_count: 0,
        }
    }

    /// Simulated latency before the outcome resolves.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Limit how many times this rule may match.
    #[must_use]
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    fn matches(&self, url: &str) -> bool {
        if let Some(limit) = self.times {
            if self.matched_count >= limit {
                return false;
            }
        }
        self.url_pattern.is_match(url)
    }
}

/// Mock [`Fetcher`] answering from rules and recording every request.
pub struct MockFetch {
    rules: RwLock<Vec<MockFetchRule>>,
    requests: RwLock<Vec<FetchRequest>>,
    fail_on_unmatched: bool,
}

impl MockFetch {
    /// Create an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            requests: RwLock::new(Vec::new()),
            fail_on_unmatched: true,
        }
    }

    /// Add a rule.
    #[must_use]
    pub fn rule(self, rule: MockFetchRule) -> Self {
        self.rules.write().push(rule);
        self
    }

    /// Whether unmatched requests fail (default) or get a 404 response.
    #[must_use]
    pub fn fail_on_unmatched(mut self, fail: bool) -> Self {
        self.fail_on_unmatched = fail;
        self
    }

    /// Fluent builder: start a rule for a URL pattern.
    #[must_use]
    pub fn on(self, url_pattern: &str) -> MockFetchBuilder {
        MockFetchBuilder {
            mock: self,
            url_pattern: url_pattern.to_string(),
            latency: None,
            times: None,
        }
    }

    /// All recorded requests.
    #[must_use]
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.read().clone()
    }

    /// Number of requests made.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.read().len()
    }

    /// Whether some request matched the pattern.
    ///
    /// # Panics
    ///
    /// Panics when the pattern is not a valid regex.
    #[must_use]
    pub fn requested(&self, url_pattern: &str) -> bool {
        let re = Regex::new(url_pattern).expect("invalid URL pattern");
        self.requests.read().iter().any(|r| re.is_match(&r.url))
    }
}

impl Default for MockFetch {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for MockFetch {
    fn get(&self, url: &str, timeout_ms: u64) -> FetchFuture<'_> {
        self.requests.write().push(FetchRequest {
            url: url.to_string(),
            timeout_ms,
        });

        let mut rules = self.rules.write();
        let matched = rules.iter_mut().find(|rule| rule.matches(url));

        match matched {
            Some(rule) => {
                rule.matched_count += 1;
                let outcome = rule.outcome.clone();
                let latency = rule.latency;
                let url = url.to_string();

                Box::pin(async move {
                    if let Some(delay) = latency {
                        tokio::time::sleep(delay).await;
                    }
                    outcome.map_err(|cause| PageError::RouterFetch { url, cause })
                })
            }
            None => {
                let url = url.to_string();
                if self.fail_on_unmatched {
                    Box::pin(async move {
                        Err(PageError::RouterFetch {
                            url,
                            cause: "no mock rule matched".to_string(),
                        })
                    })
                } else {
                    Box::pin(async move {
                        Ok(FetchResponse::new(404, "Not Found", ""))
                    })
                }
            }
        }
    }
}

/// Builder for fluent rule creation.
pub struct MockFetchBuilder {
    mock: MockFetch,
    url_pattern: String,
    latency: Option<Duration>,
    times: Option<usize>,
}

impl MockFetchBuilder {
    /// Simulated latency before the outcome resolves.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Limit how many times the rule may match.
    #[must_use]
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Answer with an HTML body.
    #[must_use]
    pub fn respond_html(self, status: u16, html: &str) -> MockFetch {
        let status_text = match status {
            200 => "OK",
            404 => "Not Found",
            500 => "Internal Server Error",
            _ => "",
        };
        self.respond(FetchResponse::new(status, status_text, html))
    }

    /// Answer with a full response.
    #[must_use]
    pub fn respond(self, response: FetchResponse) -> MockFetch {
        let mut rule = MockFetchRule::new(&self.url_pattern, response);
        rule.latency = self.latency;
        rule.times = self.times;
        self.mock.rule(rule)
    }

    /// Fail at the transport level.
    #[must_use]
    pub fn fail(self, cause: impl Into<String>) -> MockFetch {
        let mut rule = MockFetchRule::failing(&self.url_pattern, cause);
        rule.latency = self.latency;
        rule.times = self.times;
        self.mock.rule(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn matches_and_records() {
        let mock = MockFetch::new()
            .on(r"^/next$")
            .respond_html(200, "<html><body></body></html>");

        let response = mock.get("/next", 500).await.unwrap();
        assert_eq!(response.status, 200);
        assert!(response.ok());
        assert_eq!(mock.request_count(), 1);
        assert!(mock.requested(r"^/next$"));
    }

    #[tokio::test]
    async fn unmatched_fails_by_default() {
        let mock = MockFetch::new().on(r"^/known$").respond_html(200, "x");
        let err = mock.get("/other", 500).await.unwrap_err();
        assert_eq!(err.code(), "E202");
    }

    #[tokio::test]
    async fn unmatched_can_404() {
        let mock = MockFetch::new().fail_on_unmatched(false);
        let response = mock.get("/missing", 500).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn failing_rule() {
        let mock = MockFetch::new().on(r"\.js$").fail("connection reset");
        let err = mock.get("/app.js", 400).await.unwrap_err();
        assert!(matches!(err, PageError::RouterFetch { .. }));
    }

    #[tokio::test]
    async fn times_limit() {
        let mock = MockFetch::new().on(r"^/once$").times(1).respond_html(200, "x");
        mock.get("/once", 500).await.unwrap();
        assert!(mock.get("/once", 500).await.is_err());
    }
}
