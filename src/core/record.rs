use serde_json::{json, Value};

/// One typed record of the output protocol. Records are emitted strictly in
/// the order their triggering frames were parsed; text blocks are delimited
/// by a start/end pair whose deltas concatenate back to the full text.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputRecord {
    TextStart { id: String },
    TextDelta { id: String, delta: String },
    TextEnd { id: String },
    Error { message: String },
    Data { tag: DataTag, data: Value },
}

/// String tag of the structured metadata record family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataTag {
    RunStarted,
    Session,
    RunMetrics,
    ReasoningStarted,
    ReasoningDelta,
    ReasoningCompleted,
    ToolCallStarted,
    ToolCallCompleted,
    MemberStarted,
    MemberContent,
    MemberCompleted,
    MemberError,
}

impl DataTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataTag::RunStarted => "run-started",
            DataTag::Session => "session",
            DataTag::RunMetrics => "run-metrics",
            DataTag::ReasoningStarted => "reasoning-started",
            DataTag::ReasoningDelta => "reasoning-delta",
            DataTag::ReasoningCompleted => "reasoning-completed",
            DataTag::ToolCallStarted => "tool-call-started",
            DataTag::ToolCallCompleted => "tool-call-completed",
            DataTag::MemberStarted => "member-started",
            DataTag::MemberContent => "member-content",
            DataTag::MemberCompleted => "member-completed",
            DataTag::MemberError => "member-error",
        }
    }
}

impl std::fmt::Display for DataTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OutputRecord {
    pub fn data(tag: DataTag, data: Value) -> OutputRecord {
        OutputRecord::Data { tag, data }
    }

    /// Wire encoding consumed by the rendering layer.
    pub fn to_wire(&self) -> Value {
        match self {
            OutputRecord::TextStart { id } => json!({"type": "text-start", "id": id}),
            OutputRecord::TextDelta { id, delta } => {
                json!({"type": "text-delta", "id": id, "delta": delta})
            }
            OutputRecord::TextEnd { id } => json!({"type": "text-end", "id": id}),
            OutputRecord::Error { message } => json!({"type": "error", "errorText": message}),
            OutputRecord::Data { tag, data } => {
                json!({"type": format!("data-{tag}"), "data": data})
            }
        }
    }
}
