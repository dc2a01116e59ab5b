//! Error types for pageflow.
//!
//! This module provides strongly-typed errors with actionable context.
//! Errors carry the address or stage they relate to so a failed
//! navigation can be diagnosed from logs alone.

use crate::types::Stage;
use thiserror::Error;

/// The main error type for pageflow operations.
///
/// Error kinds map onto the navigation failure policy:
///
/// - `ReferrerAliased` is fatal and is the only error a navigation run
///   surfaces to its caller.
/// - `Redirect` is a control-flow signal, swallowed silently by the run
///   driver (no error stage, no recorded error).
/// - Everything else is contained: recorded on the navigation state and
///   dispatched through the `error` stage.
#[derive(Error, Debug, Clone)]
pub enum PageError {
    // =========================================================================
    // Lifecycle setup errors (E001-E099)
    // =========================================================================
    /// A navigation state was given itself as referrer.
    #[error("E001: navigation state and referrer must be distinct")]
    ReferrerAliased,

    /// An operation needed an active navigation state and none exists yet.
    #[error("E002: no navigation has run yet")]
    NoCurrentState,

    // =========================================================================
    // Address errors (E101-E199)
    // =========================================================================
    /// Failed to parse an address.
    #[error("E101: failed to parse address '{input}': {cause}")]
    AddressParse {
        /// The input that could not be parsed.
        input: String,
        /// Reason for the parse failure.
        cause: String,
    },

    // =========================================================================
    // Routing/fetch errors (E201-E299)
    // =========================================================================
    /// A redirect is in progress; the current navigation must be abandoned.
    #[error("E201: redirect in progress (status {code})")]
    Redirect {
        /// The redirect status code thrown by the router.
        code: u16,
    },

    /// The document fetch failed at the transport level.
    #[error("E202: failed to fetch document at {url}: {cause}")]
    RouterFetch {
        /// The address being fetched.
        url: String,
        /// Reason for the fetch failure.
        cause: String,
    },

    /// The server answered with an error status and no usable body.
    #[error("E203: empty document at {url}: {status} {status_text}")]
    EmptyDocument {
        /// The address being fetched.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The HTTP status text.
        status_text: String,
    },

    /// The fetched payload could not be parsed into a document.
    #[error("E204: cannot parse remote document at {url}: {cause}")]
    DocumentParse {
        /// The address being fetched.
        url: String,
        /// Reason for the parse failure.
        cause: String,
    },

    // =========================================================================
    // Stage listener errors (E301-E399)
    // =========================================================================
    /// A stage listener failed. Logged and isolated, never propagated.
    #[error("E301: {stage} stage listener failed: {cause}")]
    Listener {
        /// The stage whose listener failed.
        stage: Stage,
        /// Reason for the listener failure.
        cause: String,
    },

    // =========================================================================
    // History errors (E401-E499)
    // =========================================================================
    /// A persisted history payload was malformed.
    #[error("E401: invalid history payload: {cause}")]
    HistoryPayload {
        /// Description of the payload problem.
        cause: String,
    },

    /// A history navigation was attempted without a referrer.
    #[error("E402: history navigation requires a referrer")]
    MissingReferrer,
}

impl PageError {
    /// Get the error code (e.g., "E001").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ReferrerAliased => "E001",
            Self::NoCurrentState => "E002",
            Self::AddressParse { .. } => "E101",
            Self::Redirect { .. } => "E201",
            Self::RouterFetch { .. } => "E202",
            Self::EmptyDocument { .. } => "E203",
            Self::DocumentParse { .. } => "E204",
            Self::Listener { .. } => "E301",
            Self::HistoryPayload { .. } => "E401",
            Self::MissingReferrer => "E402",
        }
    }

    /// Check if this error is fatal (must abort the whole run).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ReferrerAliased)
    }

    /// Check if this error is a redirect signal rather than a real failure.
    ///
    /// Redirect signals suppress the `error` stage and leave the state's
    /// error field unset; a real browser navigation takes over instead.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }
}

/// Result type alias using `PageError`.
pub type PageResult<T> = std::result::Result<T, PageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_correct() {
        assert_eq!(PageError::ReferrerAliased.code(), "E001");
        let err = PageError::RouterFetch {
            url: "/next".to_string(),
            cause: "timeout".to_string(),
        };
        assert_eq!(err.code(), "E202");
    }

    #[test]
    fn error_display() {
        let err = PageError::EmptyDocument {
            url: "/missing".to_string(),
            status: 404,
            status_text: "Not Found".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("E203"));
        assert!(msg.contains("/missing"));
        assert!(msg.contains("404"));
    }

    #[test]
    fn redirect_classification() {
        assert!(PageError::Redirect { code: 302 }.is_redirect());
        assert!(!PageError::Redirect { code: 302 }.is_fatal());
        assert!(PageError::ReferrerAliased.is_fatal());
        assert!(!PageError::ReferrerAliased.is_redirect());
    }

    // Ensure PageError stays usable across task boundaries
    fn _assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn error_is_send_sync() {
        _assert_send_sync::<PageError>();
    }
}
