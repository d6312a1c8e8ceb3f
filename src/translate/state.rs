//! Hierarchical event-attribution state machine.
//!
//! Tracks who is currently speaking (the top-level run or a delegated team
//! member), per-speaker reasoning and tool-call sub-state, and maps every
//! parsed frame to the output records it produces. One instance per
//! translator invocation; nothing here is shared across requests.

use serde_json::{json, Value};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::core::event::{
    content_of, error_text_of, reasoning_content_of, EventKind, Frame, RunInfo, TokenMetrics,
    ToolInfo,
};
use crate::core::record::{DataTag, OutputRecord};

use super::chunk::{clean_final_content, split_paragraphs};
use super::sanitize::{is_delegation_tool, is_wholly_noise, strip_noise};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Running,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Running,
    Completed,
    Error,
}

#[derive(Debug, Clone)]
pub struct ToolCallState {
    pub id: String,
    pub name: String,
    pub args: Value,
    pub result: Option<String>,
    pub error: bool,
    pub status: CallStatus,
}

#[derive(Debug, Clone)]
pub struct ReasoningBlock {
    pub id: String,
    pub content: String,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub model: Option<String>,
    pub status: MemberStatus,
    pub content: String,
    pub tool_calls: Vec<ToolCallState>,
    pub reasoning: Option<ReasoningBlock>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

pub struct StreamState {
    team: bool,
    members: Vec<Member>,
    active_member: Option<usize>,
    member_counter: u64,
    pending_delegation: Option<String>,
    tool_counter: u64,
    reasoning_counter: u64,
    run_tools: Vec<ToolCallState>,
    run_reasoning: Option<ReasoningBlock>,
    text_id: String,
    text_started: bool,
    text_closed: bool,
    session_emitted: bool,
}

impl StreamState {
    /// Single-agent variant: no delegation tracking, every frame belongs to
    /// the run itself.
    pub fn agent() -> Self {
        Self::new(false)
    }

    /// Team variant: full delegation tracking, superset of the agent variant.
    pub fn team() -> Self {
        Self::new(true)
    }

    fn new(team: bool) -> Self {
        Self {
            team,
            members: Vec::new(),
            active_member: None,
            member_counter: 0,
            pending_delegation: None,
            tool_counter: 0,
            reasoning_counter: 0,
            run_tools: Vec::new(),
            run_reasoning: None,
            text_id: Uuid::new_v4().to_string(),
            text_started: false,
            text_closed: false,
            session_emitted: false,
        }
    }

    /// Members seen so far, in creation order. Useful for consumers that
    /// want the accumulated per-member state after the stream ends.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Tool calls attached to the run itself (not to a member).
    pub fn run_tool_calls(&self) -> &[ToolCallState] {
        &self.run_tools
    }

    /// Processes one frame, run-to-completion, and returns the output
    /// records it produces in emission order.
    pub fn apply(&mut self, frame: &Frame) -> Vec<OutputRecord> {
        trace!(event = %frame.event, "applying frame");
        match frame.kind {
            EventKind::TeamRunStarted => self.on_team_run_started(&frame.payload),
            EventKind::RunStarted => self.on_run_started(&frame.payload),
            EventKind::TeamRunContent => self.on_team_run_content(&frame.payload),
            EventKind::RunContent => self.on_run_content(&frame.payload),
            EventKind::TeamRunCompleted => self.on_team_run_completed(&frame.payload),
            EventKind::RunCompleted => self.on_run_completed(&frame.payload),
            EventKind::RunError | EventKind::MemberRunError => self.on_run_error(&frame.payload),
            EventKind::TeamRunError => vec![OutputRecord::Error {
                message: error_text_of(&frame.payload),
            }],
            EventKind::MemberRunStarted => self.on_member_run_started(&frame.payload),
            EventKind::MemberRunCompleted => self.on_member_run_completed(&frame.payload),
            EventKind::ReasoningStarted => self.on_reasoning_started(),
            EventKind::ReasoningDelta | EventKind::ReasoningStep => {
                self.on_reasoning_delta(&frame.payload)
            }
            EventKind::ReasoningCompleted => self.on_reasoning_completed(),
            EventKind::ToolCallStarted => self.on_tool_call_started(&frame.payload),
            EventKind::ToolCallCompleted => self.on_tool_call_completed(&frame.payload, false),
            EventKind::ToolCallError => self.on_tool_call_completed(&frame.payload, true),
            EventKind::TeamToolCallStarted => self.on_team_tool_call_started(&frame.payload),
            // Internal bookkeeping only.
            EventKind::TeamToolCallCompleted
            | EventKind::ModelRequestStarted
            | EventKind::ModelRequestCompleted => Vec::new(),
            EventKind::Other => self.on_unrecognized(frame),
        }
    }

    /// Called once when the upstream stream ends; closes a dangling open
    /// text block so every text-start has a matching text-end.
    pub fn finish(&mut self) -> Vec<OutputRecord> {
        let mut out = Vec::new();
        self.close_text(&mut out);
        out
    }

    // -----------------------------------------------------------------------
    // Run lifecycle
    // -----------------------------------------------------------------------

    fn on_team_run_started(&mut self, payload: &Value) -> Vec<OutputRecord> {
        let info = RunInfo::from_payload(payload);
        vec![OutputRecord::data(
            DataTag::RunStarted,
            json!({
                "name": info.team_name.or(info.agent_name),
                "model": info.model,
                "model_provider": info.model_provider,
                "session_id": info.session_id,
            }),
        )]
    }

    /// A `RunStarted` frame is ambiguous between "new member" and "run
    /// restatement". A parent-run marker or a pending delegation hint decides
    /// in favor of member; an already-active member suppresses duplicate
    /// member creation.
    fn on_run_started(&mut self, payload: &Value) -> Vec<OutputRecord> {
        let info = RunInfo::from_payload(payload);
        if self.team && self.active_member.is_none() {
            if info.parent_run_id.is_some() || self.pending_delegation.is_some() {
                let hint = self.pending_delegation.take();
                return self.start_member(info.agent_name.or(hint), info.model);
            }
        } else if self.team && info.parent_run_id.is_some() {
            debug!("ignoring duplicate delegation announcement");
            return Vec::new();
        }
        vec![OutputRecord::data(
            DataTag::RunStarted,
            json!({
                "name": info.agent_name,
                "model": info.model,
                "model_provider": info.model_provider,
                "session_id": info.session_id,
            }),
        )]
    }

    fn on_team_run_completed(&mut self, payload: &Value) -> Vec<OutputRecord> {
        let mut out = Vec::new();
        if !self.text_started {
            if let Some(content) = content_of(payload) {
                self.emit_final_text(content, &mut out);
            }
        } else {
            self.close_text(&mut out);
        }
        let metrics = TokenMetrics::from_payload(payload).unwrap_or_default();
        out.push(OutputRecord::data(
            DataTag::RunMetrics,
            json!({
                "input_tokens": metrics.input_tokens,
                "output_tokens": metrics.output_tokens,
            }),
        ));
        self.emit_session(payload, &mut out);
        out
    }

    fn on_run_completed(&mut self, payload: &Value) -> Vec<OutputRecord> {
        let info = RunInfo::from_payload(payload);
        if self.team && (self.active_member.is_some() || info.parent_run_id.is_some()) {
            // Member attribution wins; the content never mirrors onto the
            // run's own text.
            return match self.active_member.take() {
                Some(idx) => self.complete_member(idx, payload),
                None => {
                    debug!("member-scoped completion with no active member, dropping");
                    Vec::new()
                }
            };
        }

        let mut out = Vec::new();
        if !self.text_started {
            if let Some(content) = content_of(payload) {
                self.emit_final_text(content, &mut out);
            }
        } else {
            self.close_text(&mut out);
        }
        if let Some(metrics) = TokenMetrics::from_payload(payload) {
            out.push(OutputRecord::data(
                DataTag::RunMetrics,
                json!({
                    "input_tokens": metrics.input_tokens,
                    "output_tokens": metrics.output_tokens,
                }),
            ));
        }
        self.emit_session(payload, &mut out);
        out
    }

    fn on_run_error(&mut self, payload: &Value) -> Vec<OutputRecord> {
        let message = error_text_of(payload);
        if let Some(idx) = self.active_member.take() {
            let member = &mut self.members[idx];
            member.status = MemberStatus::Error;
            return vec![OutputRecord::data(
                DataTag::MemberError,
                json!({
                    "id": member.id.clone(),
                    "name": member.name.clone(),
                    "message": message,
                }),
            )];
        }
        vec![OutputRecord::Error { message }]
    }

    fn emit_session(&mut self, payload: &Value, out: &mut Vec<OutputRecord>) {
        if self.session_emitted {
            return;
        }
        if let Some(session_id) = RunInfo::from_payload(payload).session_id {
            out.push(OutputRecord::data(
                DataTag::Session,
                json!({"session_id": session_id}),
            ));
            self.session_emitted = true;
        }
    }

    // -----------------------------------------------------------------------
    // Members
    // -----------------------------------------------------------------------

    fn on_member_run_started(&mut self, payload: &Value) -> Vec<OutputRecord> {
        let info = RunInfo::from_payload(payload);
        let hint = self.pending_delegation.take();
        self.start_member(info.agent_name.or(hint), info.model)
    }

    fn start_member(&mut self, name: Option<String>, model: Option<String>) -> Vec<OutputRecord> {
        self.member_counter += 1;
        let id = format!("member-{}", self.member_counter);
        let name = name.unwrap_or_else(|| format!("Member {}", self.member_counter));
        let record = OutputRecord::data(
            DataTag::MemberStarted,
            json!({"id": id.clone(), "name": name.clone(), "model": model.clone()}),
        );
        self.members.push(Member {
            id,
            name,
            model,
            status: MemberStatus::Running,
            content: String::new(),
            tool_calls: Vec::new(),
            reasoning: None,
            input_tokens: 0,
            output_tokens: 0,
        });
        self.active_member = Some(self.members.len() - 1);
        vec![record]
    }

    fn on_member_run_completed(&mut self, payload: &Value) -> Vec<OutputRecord> {
        match self.active_member.take() {
            Some(idx) => self.complete_member(idx, payload),
            None => {
                debug!("MemberRunCompleted with no active member, dropping");
                Vec::new()
            }
        }
    }

    fn complete_member(&mut self, idx: usize, payload: &Value) -> Vec<OutputRecord> {
        let metrics = TokenMetrics::from_payload(payload);
        let final_content = content_of(payload)
            .map(strip_noise)
            .filter(|c| !is_wholly_noise(c));
        let member = &mut self.members[idx];
        if let Some(content) = final_content {
            member.content = content;
        }
        if let Some(m) = metrics {
            member.input_tokens = m.input_tokens;
            member.output_tokens = m.output_tokens;
        }
        member.status = MemberStatus::Completed;
        vec![OutputRecord::data(
            DataTag::MemberCompleted,
            json!({
                "id": member.id.clone(),
                "name": member.name.clone(),
                "content": member.content.clone(),
                "input_tokens": member.input_tokens,
                "output_tokens": member.output_tokens,
            }),
        )]
    }

    // -----------------------------------------------------------------------
    // Content
    // -----------------------------------------------------------------------

    /// Coordinator content is always run-level text, even while a member is
    /// active.
    fn on_team_run_content(&mut self, payload: &Value) -> Vec<OutputRecord> {
        match content_of(payload) {
            Some(content) => self.run_text_records(content),
            None => Vec::new(),
        }
    }

    /// Member-scoped content kind: routed to the active member when one
    /// exists, otherwise run-level text.
    fn on_run_content(&mut self, payload: &Value) -> Vec<OutputRecord> {
        let Some(content) = content_of(payload) else {
            return Vec::new();
        };
        if let Some(idx) = self.active_member {
            let clean = strip_noise(content);
            if is_wholly_noise(&clean) {
                return Vec::new();
            }
            let member = &mut self.members[idx];
            member.content.push_str(&clean);
            return vec![OutputRecord::data(
                DataTag::MemberContent,
                json!({"id": member.id.clone(), "delta": clean}),
            )];
        }
        self.run_text_records(content)
    }

    fn run_text_records(&mut self, content: &str) -> Vec<OutputRecord> {
        let clean = strip_noise(content);
        if is_wholly_noise(&clean) {
            return Vec::new();
        }
        if self.text_closed {
            debug!("run text delta after text block closed, dropping");
            return Vec::new();
        }
        let mut out = Vec::new();
        if !self.text_started {
            out.push(OutputRecord::TextStart {
                id: self.text_id.clone(),
            });
            self.text_started = true;
        }
        out.push(OutputRecord::TextDelta {
            id: self.text_id.clone(),
            delta: clean,
        });
        out
    }

    /// Final-summary path: clean the block once, then emit it as ordered
    /// paragraph deltas for a progressive reveal.
    fn emit_final_text(&mut self, raw: &str, out: &mut Vec<OutputRecord>) {
        let Some(clean) = clean_final_content(raw) else {
            return;
        };
        out.push(OutputRecord::TextStart {
            id: self.text_id.clone(),
        });
        for fragment in split_paragraphs(&clean) {
            out.push(OutputRecord::TextDelta {
                id: self.text_id.clone(),
                delta: fragment,
            });
        }
        out.push(OutputRecord::TextEnd {
            id: self.text_id.clone(),
        });
        self.text_started = true;
        self.text_closed = true;
    }

    fn close_text(&mut self, out: &mut Vec<OutputRecord>) {
        if self.text_started && !self.text_closed {
            out.push(OutputRecord::TextEnd {
                id: self.text_id.clone(),
            });
            self.text_closed = true;
        }
    }

    // -----------------------------------------------------------------------
    // Reasoning
    // -----------------------------------------------------------------------

    fn on_reasoning_started(&mut self) -> Vec<OutputRecord> {
        self.reasoning_counter += 1;
        let id = format!("reasoning-{}", self.reasoning_counter);
        let member_id = self.active_member_id();
        let block = ReasoningBlock {
            id: id.clone(),
            content: String::new(),
            active: true,
        };
        match self.active_member {
            Some(idx) => self.members[idx].reasoning = Some(block),
            None => self.run_reasoning = Some(block),
        }
        vec![OutputRecord::data(
            DataTag::ReasoningStarted,
            with_member(json!({"id": id}), member_id),
        )]
    }

    fn on_reasoning_delta(&mut self, payload: &Value) -> Vec<OutputRecord> {
        let Some(delta) = reasoning_content_of(payload) else {
            return Vec::new();
        };
        if delta.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::new();
        if !self
            .current_reasoning()
            .map(|b| b.active)
            .unwrap_or(false)
        {
            // Some backends skip ReasoningStarted; open the block implicitly.
            out.extend(self.on_reasoning_started());
        }
        let member_id = self.active_member_id();
        if let Some(block) = self.current_reasoning_mut() {
            block.content.push_str(delta);
            out.push(OutputRecord::data(
                DataTag::ReasoningDelta,
                with_member(json!({"id": block.id.clone(), "delta": delta}), member_id),
            ));
        }
        out
    }

    fn on_reasoning_completed(&mut self) -> Vec<OutputRecord> {
        let member_id = self.active_member_id();
        let Some(block) = self.current_reasoning_mut() else {
            return Vec::new();
        };
        if !block.active {
            return Vec::new();
        }
        block.active = false;
        vec![OutputRecord::data(
            DataTag::ReasoningCompleted,
            with_member(
                json!({"id": block.id.clone(), "content": block.content.clone()}),
                member_id,
            ),
        )]
    }

    fn current_reasoning(&self) -> Option<&ReasoningBlock> {
        match self.active_member {
            Some(idx) => self.members[idx].reasoning.as_ref(),
            None => self.run_reasoning.as_ref(),
        }
    }

    fn current_reasoning_mut(&mut self) -> Option<&mut ReasoningBlock> {
        match self.active_member {
            Some(idx) => self.members[idx].reasoning.as_mut(),
            None => self.run_reasoning.as_mut(),
        }
    }

    // -----------------------------------------------------------------------
    // Tool calls
    // -----------------------------------------------------------------------

    /// Delegation announced by the coordinator: remember the member-name hint
    /// so the next unlabeled `RunStarted` can be attributed; emit nothing.
    fn on_team_tool_call_started(&mut self, payload: &Value) -> Vec<OutputRecord> {
        let Some(tool) = ToolInfo::from_payload(payload) else {
            return Vec::new();
        };
        if is_delegation_tool(&tool.name) {
            self.pending_delegation = tool.delegation_hint();
            return Vec::new();
        }
        self.tool_call_started(tool)
    }

    fn on_tool_call_started(&mut self, payload: &Value) -> Vec<OutputRecord> {
        let Some(tool) = ToolInfo::from_payload(payload) else {
            return Vec::new();
        };
        if is_delegation_tool(&tool.name) {
            return Vec::new();
        }
        self.tool_call_started(tool)
    }

    fn tool_call_started(&mut self, tool: ToolInfo) -> Vec<OutputRecord> {
        self.tool_counter += 1;
        let id = tool
            .id
            .unwrap_or_else(|| format!("call-{}", self.tool_counter));
        let member_id = self.active_member_id();
        let record = OutputRecord::data(
            DataTag::ToolCallStarted,
            with_member(
                json!({"id": id.clone(), "name": tool.name.clone(), "args": tool.args.clone()}),
                member_id,
            ),
        );
        self.speaker_tool_calls().push(ToolCallState {
            id,
            name: tool.name,
            args: tool.args,
            result: None,
            error: false,
            status: CallStatus::Running,
        });
        vec![record]
    }

    fn on_tool_call_completed(&mut self, payload: &Value, force_error: bool) -> Vec<OutputRecord> {
        let Some(tool) = ToolInfo::from_payload(payload) else {
            return Vec::new();
        };
        if is_delegation_tool(&tool.name) {
            return Vec::new();
        }
        let member_id = self.active_member_id();
        let error = force_error || tool.error;
        let status = if error {
            CallStatus::Error
        } else {
            CallStatus::Completed
        };

        let calls = self.speaker_tool_calls();
        // Resolve by id when present, otherwise the most recent running call.
        let resolved = match &tool.id {
            Some(id) => calls.iter_mut().find(|c| c.id == *id),
            None => calls.iter_mut().rev().find(|c| c.status == CallStatus::Running),
        };
        if let Some(call) = resolved {
            call.result = tool.result.clone();
            call.error = error;
            call.status = status;
            return vec![OutputRecord::data(
                DataTag::ToolCallCompleted,
                with_member(
                    json!({
                        "id": call.id.clone(),
                        "name": call.name.clone(),
                        "result": tool.result,
                        "error": error,
                    }),
                    member_id,
                ),
            )];
        }

        // Completion for a call we never saw start; surface it anyway.
        let id = tool
            .id
            .unwrap_or_else(|| format!("call-{}", self.tool_counter));
        vec![OutputRecord::data(
            DataTag::ToolCallCompleted,
            with_member(
                json!({
                    "id": id,
                    "name": tool.name,
                    "result": tool.result,
                    "error": error,
                }),
                member_id,
            ),
        )]
    }

    fn speaker_tool_calls(&mut self) -> &mut Vec<ToolCallState> {
        match self.active_member {
            Some(idx) => &mut self.members[idx].tool_calls,
            None => &mut self.run_tools,
        }
    }

    // -----------------------------------------------------------------------
    // Fallback
    // -----------------------------------------------------------------------

    fn on_unrecognized(&mut self, frame: &Frame) -> Vec<OutputRecord> {
        if self.active_member.is_some() {
            debug!(event = %frame.event, "dropping unrecognized event during member run");
            return Vec::new();
        }
        match content_of(&frame.payload) {
            Some(content) => {
                debug!(event = %frame.event, "forwarding content of unrecognized event");
                self.run_text_records(content)
            }
            None => Vec::new(),
        }
    }

    fn active_member_id(&self) -> Option<String> {
        self.active_member.map(|idx| self.members[idx].id.clone())
    }
}

fn with_member(mut data: Value, member_id: Option<String>) -> Value {
    if let (Some(map), Some(id)) = (data.as_object_mut(), member_id) {
        map.insert("member_id".into(), id.into());
    }
    data
}
