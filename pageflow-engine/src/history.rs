//! History coordination: push/replace/reload/save and back/forward.

use crate::engine::Engine;
use crate::state::NavigationState;
use pageflow_core::address;
use pageflow_core::{HistoryEntry, PageError, PageResult};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Which history operation persists a run's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HistoryMethod {
    Push,
    Replace,
}

impl fmt::Display for HistoryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Push => "push",
            Self::Replace => "replace",
        })
    }
}

/// A navigation target: an address plus optional opaque data carried
/// onto the new state.
#[derive(Debug, Clone)]
pub struct Target {
    /// The target address (relative or absolute).
    pub address: String,
    /// Data for the new state, carried across history save/restore.
    pub data: Option<Map<String, Value>>,
}

impl Target {
    /// A target for an address with no data.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            data: None,
        }
    }

    /// Attach data to the target.
    #[must_use]
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }
}

impl From<&str> for Target {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Target {
    fn from(address: String) -> Self {
        Self::new(address)
    }
}

impl Engine {
    /// Navigate to a target and push the outcome onto history.
    ///
    /// Cross-origin targets leave the in-page flow: the host performs a
    /// real navigation and the current state is returned unchanged.
    ///
    /// # Errors
    ///
    /// [`PageError::MissingReferrer`] when no navigation has run yet,
    /// [`PageError::AddressParse`] for unparseable targets, or a fatal
    /// setup error from the run.
    pub async fn push(&self, target: impl Into<Target>) -> PageResult<Arc<NavigationState>> {
        self.navigate(HistoryMethod::Push, target.into()).await
    }

    /// Navigate to a target, replacing the current history entry.
    ///
    /// Note the cross-origin case is not equivalent to an in-page
    /// replace: only a full navigation occurs.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub async fn replace(&self, target: impl Into<Target>) -> PageResult<Arc<NavigationState>> {
        self.navigate(HistoryMethod::Replace, target.into()).await
    }

    async fn navigate(
        &self,
        method: HistoryMethod,
        target: Target,
    ) -> PageResult<Arc<NavigationState>> {
        let refer = self.current().ok_or(PageError::MissingReferrer)?;
        let base = self.host().location();
        // Parse through format so targets normalize like hrefs do
        let addr = address::parse(&target.address, &base)?;
        let addr = address::parse(&address::format(&addr, &base), &base)?;

        if !address::same_origin(&addr, refer.address(), &base) {
            let url = address::format(&addr, &base);
            if method == HistoryMethod::Replace {
                tracing::info!(url = %url, "cannot replace to a different origin");
            }
            self.host().assign_location(&url);
            return Ok(refer);
        }

        let state = Arc::new(NavigationState::from_address(addr));
        if let Some(data) = target.data {
            state.set_data(data);
        }
        state.set_prerender(refer.prerender());
        state.set_referrer(Arc::clone(&refer));
        tracing::debug!(method = %method, state = %state.id(), "run");

        let state = self.run(state).await?;
        self.history_save(method, &state)?;
        Ok(state)
    }

    /// Re-persist the current state via history replace, without
    /// navigating.
    ///
    /// # Errors
    ///
    /// [`PageError::NoCurrentState`] when nothing has run yet, or a
    /// host persistence failure.
    pub fn save(&self) -> PageResult<()> {
        let state = self.current().ok_or(PageError::NoCurrentState)?;
        self.history_save(HistoryMethod::Replace, &state)
    }

    /// Re-run the current state against a referrer stripped of address
    /// fields, forcing a full re-route.
    ///
    /// # Errors
    ///
    /// [`PageError::NoCurrentState`] when nothing has run yet, or a
    /// fatal setup error from the run.
    pub async fn reload(&self) -> PageResult<Arc<NavigationState>> {
        let state = self.current().ok_or(PageError::NoCurrentState)?;
        tracing::debug!(state = %state.id(), "reload");
        let prev = Arc::new(state.detached_copy());
        state.set_referrer(prev);
        self.run(state).await
    }

    /// Handle a back/forward event delivered by the host.
    ///
    /// The state is rebuilt from the persisted payload when present,
    /// else from the document's current address; its referrer is the
    /// currently active state.
    ///
    /// # Errors
    ///
    /// [`PageError::AddressParse`] for an unparseable payload href, or
    /// a fatal setup error from the run.
    pub async fn pop(&self, entry: Option<HistoryEntry>) -> PageResult<Arc<NavigationState>> {
        let base = self.host().location();
        let state = match entry.filter(|e| !e.href.is_empty()) {
            Some(entry) => NavigationState::from_entry(&entry, &base)?,
            None => NavigationState::from_address(address::parse("", &base)?),
        };
        let state = Arc::new(state);
        if let Some(current) = self.current() {
            state.set_referrer(current);
        }
        tracing::debug!(state = %state.id(), "history event");
        self.run(state).await
    }

    fn history_save(&self, method: HistoryMethod, state: &Arc<NavigationState>) -> PageResult<()> {
        let base = self.host().location();
        let entry = state.to_entry(&base);
        tracing::debug!(method = %method, href = %entry.href, "history save");
        let title = self.host().title();
        match method {
            HistoryMethod::Push => self.host().history_push(&entry, &title),
            HistoryMethod::Replace => self.host().history_replace(&entry, &title),
        }
    }
}
