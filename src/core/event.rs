use serde_json::Value;

/// One decoded (event name, payload) unit from the upstream stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub event: String,
    pub kind: EventKind,
    pub payload: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        let event = event.into();
        let kind = EventKind::from_name(&event);
        Self {
            event,
            kind,
            payload,
        }
    }
}

/// Closed enumeration of the upstream event kinds. Anything the backend
/// sends that we do not recognize lands in `Other` and is handled by the
/// state machine's fallback arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    RunStarted,
    RunContent,
    RunCompleted,
    RunError,
    TeamRunStarted,
    TeamRunContent,
    TeamRunCompleted,
    TeamRunError,
    MemberRunStarted,
    MemberRunCompleted,
    MemberRunError,
    ReasoningStarted,
    ReasoningDelta,
    ReasoningStep,
    ReasoningCompleted,
    ToolCallStarted,
    ToolCallCompleted,
    ToolCallError,
    TeamToolCallStarted,
    TeamToolCallCompleted,
    ModelRequestStarted,
    ModelRequestCompleted,
    Other,
}

impl EventKind {
    pub fn from_name(name: &str) -> EventKind {
        match name {
            "RunStarted" => EventKind::RunStarted,
            "RunContent" | "RunContentDelta" => EventKind::RunContent,
            "RunCompleted" => EventKind::RunCompleted,
            "RunError" => EventKind::RunError,
            "TeamRunStarted" => EventKind::TeamRunStarted,
            "TeamRunContent" | "TeamRunContentDelta" => EventKind::TeamRunContent,
            "TeamRunCompleted" => EventKind::TeamRunCompleted,
            "TeamRunError" => EventKind::TeamRunError,
            "MemberRunStarted" => EventKind::MemberRunStarted,
            "MemberRunCompleted" => EventKind::MemberRunCompleted,
            "MemberRunError" => EventKind::MemberRunError,
            "ReasoningStarted" | "TeamReasoningStarted" => EventKind::ReasoningStarted,
            "ReasoningContentDelta" | "TeamReasoningContentDelta" => EventKind::ReasoningDelta,
            "ReasoningStep" | "TeamReasoningStep" => EventKind::ReasoningStep,
            "ReasoningCompleted" | "TeamReasoningCompleted" => EventKind::ReasoningCompleted,
            "ToolCallStarted" | "MemberToolCallStarted" => EventKind::ToolCallStarted,
            "ToolCallCompleted" | "MemberToolCallCompleted" => EventKind::ToolCallCompleted,
            "ToolCallError" | "MemberToolCallError" => EventKind::ToolCallError,
            "TeamToolCallStarted" => EventKind::TeamToolCallStarted,
            "TeamToolCallCompleted" => EventKind::TeamToolCallCompleted,
            "ModelRequestStarted" | "TeamModelRequestStarted" => EventKind::ModelRequestStarted,
            "ModelRequestCompleted" | "TeamModelRequestCompleted" => {
                EventKind::ModelRequestCompleted
            }
            _ => EventKind::Other,
        }
    }
}

// ---------------------------------------------------------------------------
// Validated payload intermediates
//
// The backend's payload shapes are loose; every "field A or field B or
// default" read lives here so the state machine only sees resolved values.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunInfo {
    pub session_id: Option<String>,
    pub model: Option<String>,
    pub model_provider: Option<String>,
    pub agent_name: Option<String>,
    pub team_name: Option<String>,
    pub parent_run_id: Option<String>,
}

impl RunInfo {
    pub fn from_payload(payload: &Value) -> RunInfo {
        RunInfo {
            session_id: str_field(payload, &["session_id"]),
            model: str_field(payload, &["model", "model_id"]),
            model_provider: str_field(payload, &["model_provider", "provider"]),
            agent_name: str_field(payload, &["agent_name", "member_name", "name"]),
            team_name: str_field(payload, &["team_name"]),
            parent_run_id: str_field(payload, &["parent_run_id"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolInfo {
    pub id: Option<String>,
    pub name: String,
    pub args: Value,
    pub result: Option<String>,
    pub error: bool,
}

impl ToolInfo {
    /// Reads the nested `tool` object when present, falling back to
    /// top-level fields. Returns `None` when no tool name can be found.
    pub fn from_payload(payload: &Value) -> Option<ToolInfo> {
        let tool = match payload.get("tool") {
            Some(t) if t.is_object() => t,
            _ => payload,
        };
        let name = str_field(tool, &["tool_name", "name"])?;
        let result = tool
            .get("result")
            .map(|r| match r.as_str() {
                Some(s) => s.to_string(),
                None => r.to_string(),
            })
            .filter(|s| !s.is_empty() && s != "null");
        Some(ToolInfo {
            id: str_field(tool, &["tool_call_id", "id"]),
            name,
            args: tool
                .get("tool_args")
                .or_else(|| tool.get("args"))
                .cloned()
                .unwrap_or(Value::Null),
            result,
            error: tool
                .get("tool_call_error")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }

    /// Member-name hint carried by a delegation tool call's arguments.
    pub fn delegation_hint(&self) -> Option<String> {
        str_field(&self.args, &["member_id", "member_name", "agent_name", "agent"])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenMetrics {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenMetrics {
    pub fn from_payload(payload: &Value) -> Option<TokenMetrics> {
        let metrics = payload.get("metrics")?;
        Some(TokenMetrics {
            input_tokens: u64_field(metrics, &["input_tokens", "prompt_tokens"]),
            output_tokens: u64_field(metrics, &["output_tokens", "completion_tokens"]),
        })
    }
}

/// Free-text content of a frame, if any. Structured (non-string) content is
/// not forwarded.
pub fn content_of(payload: &Value) -> Option<&str> {
    payload.get("content").and_then(Value::as_str)
}

/// Reasoning text of a reasoning delta/step frame. Step frames carry their
/// text under a different key but are appended exactly like deltas.
pub fn reasoning_content_of(payload: &Value) -> Option<&str> {
    payload
        .get("reasoning_content")
        .or_else(|| payload.get("content"))
        .and_then(Value::as_str)
}

/// Error text of a run/member error frame, with content as fallback.
pub fn error_text_of(payload: &Value) -> String {
    str_field(payload, &["error", "content", "message"])
        .unwrap_or_else(|| "run failed".to_string())
}

fn str_field(value: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|n| value.get(n).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn u64_field(value: &Value, names: &[&str]) -> u64 {
    names
        .iter()
        .filter_map(|n| value.get(n).and_then(Value::as_u64))
        .next()
        .unwrap_or(0)
}
