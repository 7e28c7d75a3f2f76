//! Per-run trace of agent activity
//!
//! Collection is switched off with `agent.trace_runs: false` or
//! `OPENAI_AGENTS_DISABLE_TRACING`. A disabled trace records nothing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One recorded step of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// The model was asked for a completion
    Turn {
        /// Active agent
        agent: String,
        /// 1-based turn number within the run
        turn: usize,
    },
    /// A tool was executed
    ToolCall {
        /// Agent that requested the call
        agent: String,
        /// Tool name
        tool: String,
        /// Whether the tool reported success
        success: bool,
        /// Metadata attached to the tool result
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        metadata: BTreeMap<String, String>,
    },
    /// Control moved to another agent
    Handoff {
        /// Previous agent
        from: String,
        /// New active agent
        to: String,
    },
}

/// Ordered list of trace events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTrace {
    #[serde(skip)]
    enabled: bool,
    events: Vec<TraceEvent>,
}

impl RunTrace {
    /// Create a trace that records only when `enabled`
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            events: Vec::new(),
        }
    }

    /// Record an event if tracing is enabled
    pub fn record(&mut self, event: TraceEvent) {
        if self.enabled {
            tracing::trace!(?event, "run trace");
            self.events.push(event);
        }
    }

    /// Whether events are being recorded
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Recorded events
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Metadata value from the latest successful call of `tool`
    pub fn tool_metadata(&self, tool: &str, key: &str) -> Option<&str> {
        self.events.iter().rev().find_map(|event| match event {
            TraceEvent::ToolCall {
                tool: name,
                success: true,
                metadata,
                ..
            } if name == tool => metadata.get(key).map(String::as_str),
            _ => None,
        })
    }

    /// Agents that handled the run, in handoff order
    pub fn agent_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        for event in &self.events {
            match event {
                TraceEvent::Turn { agent, .. } if path.is_empty() => path.push(agent.as_str()),
                TraceEvent::Handoff { to, .. } => path.push(to.as_str()),
                _ => {}
            }
        }
        path
    }
}
