//! Normalized streaming chunks, as yielded by a transport

/// One decoded chunk of a streaming response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseChunk {
    /// Choices in this chunk; may be empty
    pub choices: Vec<ChunkChoice>,
}

/// A single choice within a chunk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkChoice {
    /// Incremental content for this choice
    pub delta: ChunkDelta,
    /// Reason the choice finished, on its final chunk
    pub finish_reason: Option<String>,
}

/// Incremental content of a choice
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkDelta {
    /// Text fragment
    pub content: Option<String>,
    /// Tool call fragments
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

impl ChunkDelta {
    /// Whether this delta carries at least one tool call fragment
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }
}

/// Fragment of a tool call, keyed by its index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallDelta {
    /// Position of the call within the response
    pub index: u32,
    /// Call identifier fragment
    pub id: Option<String>,
    /// Tool type fragment
    pub tool_type: Option<String>,
    /// Function name fragment
    pub name: Option<String>,
    /// Arguments fragment, appended in arrival order
    pub arguments: Option<String>,
}

impl ResponseChunk {
    /// Chunk with no choices
    pub const fn empty() -> Self {
        Self {
            choices: Vec::new(),
        }
    }

    /// Chunk with a single text delta
    pub fn text(content: impl Into<String>) -> Self {
        Self::from_delta(ChunkDelta {
            content: Some(content.into()),
            tool_calls: None,
        })
    }

    /// Chunk whose single choice carries tool call fragments
    pub fn tool_calls(deltas: Vec<ToolCallDelta>) -> Self {
        Self::from_delta(ChunkDelta {
            content: None,
            tool_calls: Some(deltas),
        })
    }

    /// Chunk with a single choice holding `delta`
    pub fn from_delta(delta: ChunkDelta) -> Self {
        Self {
            choices: vec![ChunkChoice {
                delta,
                finish_reason: None,
            }],
        }
    }

    /// Mark the first choice as finished
    #[must_use]
    pub fn finished(mut self, reason: impl Into<String>) -> Self {
        if let Some(choice) = self.choices.first_mut() {
            choice.finish_reason = Some(reason.into());
        }
        self
    }

    /// The choice the client acts on
    pub fn primary(&self) -> Option<&ChunkChoice> {
        self.choices.first()
    }
}

impl ToolCallDelta {
    /// Empty fragment for the call at `index`
    pub fn new(index: u32) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Set the call identifier
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the tool type
    #[must_use]
    pub fn with_type(mut self, tool_type: impl Into<String>) -> Self {
        self.tool_type = Some(tool_type.into());
        self
    }

    /// Set the function name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the arguments fragment
    #[must_use]
    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = Some(arguments.into());
        self
    }
}
