//! Core type definitions.

mod history;
mod ids;
mod stage;

pub use history::HistoryEntry;
pub use ids::{ChannelId, DomNodeId, ListenerId, StateId};
pub use stage::{Stage, STAGES};
