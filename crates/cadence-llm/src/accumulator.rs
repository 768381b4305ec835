//! Reassembly of streamed tool-call fragments
//!
//! Upstream APIs stream each tool call as a run of fragments keyed by index,
//! with no terminal marker. A run ends at the first chunk without tool-call
//! fragments, or at stream end, and is then emitted as one batch.

use std::collections::BTreeMap;

use crate::types::{ChunkChoice, FunctionCall, OutputItem, ResponseChunk, ToolCallDelta, ToolCallObject};

/// Tool type assumed when the upstream never names one
const DEFAULT_TOOL_TYPE: &str = "function";

/// Whether a tool-call run is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorState {
    /// No fragments buffered
    Idle,
    /// Fragments of at least one call are buffered
    Accumulating,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    tool_type: Option<String>,
    name: Option<String>,
    arguments: String,
}

impl PartialToolCall {
    fn merge(&mut self, delta: &ToolCallDelta) {
        if let Some(id) = non_empty(delta.id.as_deref()) {
            self.id = Some(id.to_owned());
        }
        if let Some(tool_type) = non_empty(delta.tool_type.as_deref()) {
            self.tool_type = Some(tool_type.to_owned());
        }
        if let Some(name) = non_empty(delta.name.as_deref()) {
            self.name = Some(name.to_owned());
        }
        if let Some(arguments) = non_empty(delta.arguments.as_deref()) {
            self.arguments.push_str(arguments);
        }
    }

    fn finish(self) -> ToolCallObject {
        ToolCallObject {
            id: self.id.unwrap_or_default(),
            tool_type: self.tool_type.unwrap_or_else(|| DEFAULT_TOOL_TYPE.to_owned()),
            function: FunctionCall {
                name: self.name.unwrap_or_default(),
                arguments: self.arguments,
            },
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Per-call state machine turning chunks into [`OutputItem`]s
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<u32, PartialToolCall>,
}

impl ToolCallAccumulator {
    /// Create an idle accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> AccumulatorState {
        if self.calls.is_empty() {
            AccumulatorState::Idle
        } else {
            AccumulatorState::Accumulating
        }
    }

    /// Feed one chunk, returning the items it releases
    ///
    /// Only the first choice is considered. Chunks with no choices release
    /// nothing and leave the state untouched. A chunk carrying tool-call
    /// fragments releases nothing; any other chunk first flushes a pending
    /// run and then releases its text, empty when it carried none.
    pub fn drive(&mut self, chunk: &ResponseChunk) -> Vec<OutputItem> {
        let Some(choice) = chunk.primary() else {
            return Vec::new();
        };
        self.drive_choice(choice)
    }

    fn drive_choice(&mut self, choice: &ChunkChoice) -> Vec<OutputItem> {
        if choice.delta.has_tool_calls() {
            for delta in choice.delta.tool_calls.iter().flatten() {
                self.calls.entry(delta.index).or_default().merge(delta);
            }
            return Vec::new();
        }

        let mut items = Vec::with_capacity(2);
        if let Some(batch) = self.flush() {
            items.push(OutputItem::ToolCalls(batch));
        }
        items.push(OutputItem::Text(choice.delta.content.clone().unwrap_or_default()));
        items
    }

    /// Finalize the pending run, ordered by index, and return to idle
    ///
    /// Returns `None` when nothing was buffered.
    pub fn flush(&mut self) -> Option<Vec<ToolCallObject>> {
        if self.calls.is_empty() {
            return None;
        }

        let calls = std::mem::take(&mut self.calls);
        tracing::debug!(count = calls.len(), "tool call run completed");
        Some(calls.into_values().map(PartialToolCall::finish).collect())
    }
}
