use serde_json::json;

use super::event::*;
use super::record::*;

#[test]
fn test_event_kind_mapping() {
    assert_eq!(EventKind::from_name("RunStarted"), EventKind::RunStarted);
    assert_eq!(
        EventKind::from_name("TeamRunContent"),
        EventKind::TeamRunContent
    );
    assert_eq!(
        EventKind::from_name("MemberRunCompleted"),
        EventKind::MemberRunCompleted
    );
    assert_eq!(
        EventKind::from_name("ToolCallError"),
        EventKind::ToolCallError
    );
    assert_eq!(EventKind::from_name("SomethingElse"), EventKind::Other);
}

#[test]
fn test_team_prefixed_reasoning_folds_into_same_kinds() {
    assert_eq!(
        EventKind::from_name("TeamReasoningStarted"),
        EventKind::ReasoningStarted
    );
    assert_eq!(
        EventKind::from_name("TeamReasoningContentDelta"),
        EventKind::ReasoningDelta
    );
    assert_eq!(
        EventKind::from_name("TeamReasoningStep"),
        EventKind::ReasoningStep
    );
    assert_eq!(
        EventKind::from_name("TeamModelRequestCompleted"),
        EventKind::ModelRequestCompleted
    );
}

#[test]
fn test_run_info_field_fallbacks() {
    let info = RunInfo::from_payload(&json!({
        "session_id": "s1",
        "model_id": "gpt",
        "provider": "openai",
        "member_name": "SQL Agent",
        "parent_run_id": "r0",
    }));
    assert_eq!(info.session_id.as_deref(), Some("s1"));
    assert_eq!(info.model.as_deref(), Some("gpt"));
    assert_eq!(info.model_provider.as_deref(), Some("openai"));
    assert_eq!(info.agent_name.as_deref(), Some("SQL Agent"));
    assert_eq!(info.parent_run_id.as_deref(), Some("r0"));
}

#[test]
fn test_run_info_empty_strings_treated_as_missing() {
    let info = RunInfo::from_payload(&json!({"parent_run_id": "", "agent_name": "  "}));
    assert_eq!(info.parent_run_id, None);
    assert_eq!(info.agent_name, None);
}

#[test]
fn test_tool_info_nested_object() {
    let tool = ToolInfo::from_payload(&json!({
        "tool": {
            "tool_call_id": "t1",
            "tool_name": "search",
            "tool_args": {"q": "rust"},
            "result": "hits",
        }
    }))
    .unwrap();
    assert_eq!(tool.id.as_deref(), Some("t1"));
    assert_eq!(tool.name, "search");
    assert_eq!(tool.args["q"], "rust");
    assert_eq!(tool.result.as_deref(), Some("hits"));
    assert!(!tool.error);
}

#[test]
fn test_tool_info_top_level_fields() {
    let tool = ToolInfo::from_payload(&json!({
        "tool_name": "bash",
        "tool_call_error": true,
    }))
    .unwrap();
    assert_eq!(tool.name, "bash");
    assert!(tool.error);
    assert_eq!(tool.id, None);
}

#[test]
fn test_tool_info_requires_a_name() {
    assert_eq!(ToolInfo::from_payload(&json!({"tool": {"result": "x"}})), None);
}

#[test]
fn test_delegation_hint_extraction() {
    let tool = ToolInfo::from_payload(&json!({
        "tool": {
            "tool_name": "delegate_task_to_member",
            "tool_args": {"member_id": "sql"},
        }
    }))
    .unwrap();
    assert_eq!(tool.delegation_hint().as_deref(), Some("sql"));

    let bare = ToolInfo::from_payload(&json!({"tool_name": "delegate_task_to_member"})).unwrap();
    assert_eq!(bare.delegation_hint(), None);
}

#[test]
fn test_token_metrics_field_fallbacks() {
    let metrics = TokenMetrics::from_payload(&json!({
        "metrics": {"prompt_tokens": 10, "completion_tokens": 20}
    }))
    .unwrap();
    assert_eq!(metrics.input_tokens, 10);
    assert_eq!(metrics.output_tokens, 20);

    assert_eq!(TokenMetrics::from_payload(&json!({})), None);
}

#[test]
fn test_error_text_fallbacks() {
    assert_eq!(error_text_of(&json!({"error": "boom"})), "boom");
    assert_eq!(error_text_of(&json!({"content": "bad"})), "bad");
    assert_eq!(error_text_of(&json!({})), "run failed");
}

#[test]
fn test_reasoning_content_fallback() {
    assert_eq!(
        reasoning_content_of(&json!({"reasoning_content": "a"})),
        Some("a")
    );
    assert_eq!(reasoning_content_of(&json!({"content": "b"})), Some("b"));
    assert_eq!(reasoning_content_of(&json!({})), None);
}

#[test]
fn test_text_record_wire_shapes() {
    let start = OutputRecord::TextStart { id: "t1".into() };
    assert_eq!(start.to_wire(), json!({"type": "text-start", "id": "t1"}));

    let delta = OutputRecord::TextDelta {
        id: "t1".into(),
        delta: "Hi".into(),
    };
    assert_eq!(
        delta.to_wire(),
        json!({"type": "text-delta", "id": "t1", "delta": "Hi"})
    );

    let end = OutputRecord::TextEnd { id: "t1".into() };
    assert_eq!(end.to_wire(), json!({"type": "text-end", "id": "t1"}));
}

#[test]
fn test_error_record_wire_shape() {
    let err = OutputRecord::Error {
        message: "nope".into(),
    };
    assert_eq!(err.to_wire(), json!({"type": "error", "errorText": "nope"}));
}

#[test]
fn test_data_record_wire_tag_prefix() {
    let record = OutputRecord::data(DataTag::MemberStarted, json!({"id": "member-1"}));
    assert_eq!(
        record.to_wire(),
        json!({"type": "data-member-started", "data": {"id": "member-1"}})
    );
}

#[test]
fn test_data_tag_names() {
    assert_eq!(DataTag::RunStarted.to_string(), "run-started");
    assert_eq!(DataTag::RunMetrics.to_string(), "run-metrics");
    assert_eq!(DataTag::ReasoningDelta.to_string(), "reasoning-delta");
    assert_eq!(DataTag::ToolCallCompleted.to_string(), "tool-call-completed");
    assert_eq!(DataTag::MemberError.to_string(), "member-error");
    assert_eq!(DataTag::Session.to_string(), "session");
}
