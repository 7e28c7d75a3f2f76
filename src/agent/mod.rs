//! Agent module for qiita-editor
//!
//! Agent profiles, conversation history, the run loop with handoffs, and
//! per-run tracing.

pub mod conversation;
pub mod core;
pub mod runner;
pub mod trace;

pub use conversation::Conversation;
pub use core::{Agent, HANDOFF_PREFIX};
pub use runner::{RunResult, Runner};
pub use trace::{RunTrace, TraceEvent};
