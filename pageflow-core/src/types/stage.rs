//! The fixed lifecycle stage sequence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One named step in the fixed lifecycle sequence.
///
/// A navigation progresses monotonically through
/// `init → ready → build → patch → setup → hash`. `error` and `close`
/// are out-of-band: `error` may be entered from any stage, `close` fires
/// only on the outgoing referrer when the pathname changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// The navigation started; the previous page's listeners are gone.
    Init,
    /// The next document is merged and the prerender status is known.
    Ready,
    /// First of the two content stages on an address change.
    Build,
    /// Content patching; also the stage for query-only navigations.
    Patch,
    /// The page is visible and fully set up.
    Setup,
    /// The hash fragment changed.
    Hash,
    /// The navigation failed; the state's error field is populated.
    Error,
    /// Fired on the referrer when navigating away to another pathname.
    Close,
}

/// All stages in their canonical order.
///
/// The array position is the stage's index in the total order used by
/// late-registration replay.
pub const STAGES: [Stage; 8] = [
    Stage::Init,
    Stage::Ready,
    Stage::Build,
    Stage::Patch,
    Stage::Setup,
    Stage::Hash,
    Stage::Error,
    Stage::Close,
];

impl Stage {
    /// Position of this stage in the canonical order.
    #[must_use]
    pub fn index(self) -> usize {
        STAGES.iter().position(|s| *s == self).unwrap_or(0)
    }

    /// The stage name as a static string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Ready => "ready",
            Self::Build => "build",
            Self::Patch => "patch",
            Self::Setup => "setup",
            Self::Hash => "hash",
            Self::Error => "error",
            Self::Close => "close",
        }
    }

    /// The event name dispatched for this stage (e.g. `pageinit`).
    #[must_use]
    pub fn event_name(self) -> &'static str {
        match self {
            Self::Init => "pageinit",
            Self::Ready => "pageready",
            Self::Build => "pagebuild",
            Self::Patch => "pagepatch",
            Self::Setup => "pagesetup",
            Self::Hash => "pagehash",
            Self::Error => "pageerror",
            Self::Close => "pageclose",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(Self::Init),
            "ready" => Ok(Self::Ready),
            "build" => Ok(Self::Build),
            "patch" => Ok(Self::Patch),
            "setup" => Ok(Self::Setup),
            "hash" => Ok(Self::Hash),
            "error" => Ok(Self::Error),
            "close" => Ok(Self::Close),
            _ => Err("unknown stage name"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_is_total() {
        assert!(Stage::Init.index() < Stage::Ready.index());
        assert!(Stage::Ready.index() < Stage::Build.index());
        assert!(Stage::Build.index() < Stage::Patch.index());
        assert!(Stage::Patch.index() < Stage::Setup.index());
        assert!(Stage::Setup.index() < Stage::Hash.index());
        assert!(Stage::Hash.index() < Stage::Error.index());
        assert!(Stage::Error.index() < Stage::Close.index());
    }

    #[test]
    fn stage_roundtrip() {
        for stage in STAGES {
            let parsed: Stage = stage.as_str().parse().unwrap();
            assert_eq!(parsed, stage);
        }
        assert!("bogus".parse::<Stage>().is_err());
    }

    #[test]
    fn event_names() {
        assert_eq!(Stage::Init.event_name(), "pageinit");
        assert_eq!(Stage::Close.event_name(), "pageclose");
    }

    #[test]
    fn serde_uses_lowercase() {
        let json = serde_json::to_string(&Stage::Setup).unwrap();
        assert_eq!(json, "\"setup\"");
        let stage: Stage = serde_json::from_str("\"hash\"").unwrap();
        assert_eq!(stage, Stage::Hash);
    }
}
