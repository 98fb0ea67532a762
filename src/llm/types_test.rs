// ABOUTME: Tests for transcript and model-boundary types.
// ABOUTME: Verifies serialization shape and helper behavior.

use super::*;
use crate::tool::ToolResult;

#[test]
fn test_user_message_serialization() {
    let json = serde_json::to_value(Message::user("add 2 and 3")).unwrap();
    assert_eq!(json["role"], "user");
    assert_eq!(json["content"], "add 2 and 3");
}

#[test]
fn test_assistant_tool_calls_serialization() {
    let msg = AssistantTurn::calls(vec![
        ToolCall::new("add", serde_json::json!({"a": 2, "b": 3})).with_id("call_1"),
    ])
    .into_message();

    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["role"], "assistant");
    assert!(json.get("content").is_none());
    assert_eq!(json["tool_calls"][0]["name"], "add");
    assert_eq!(json["tool_calls"][0]["arguments"]["b"], 3);
}

#[test]
fn test_tool_result_message_roundtrip() {
    let call = ToolCall::new("add", serde_json::json!({})).with_id("call_7");
    let msg = Message::tool_result(&call, ToolResult::error("boom"));

    let json = serde_json::to_string(&msg).unwrap();
    let back: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(back, msg);
    match back {
        Message::ToolResult {
            call_id, is_error, ..
        } => {
            assert_eq!(call_id, "call_7");
            assert!(is_error);
        }
        _ => panic!("Expected ToolResult"),
    }
}

#[test]
fn test_final_answer_detection() {
    assert!(Message::assistant("20").is_final_answer());
    assert!(!Message::user("hi").is_final_answer());

    let with_calls = AssistantTurn::calls(vec![ToolCall::new("add", serde_json::json!({}))]);
    assert!(with_calls.has_tool_calls());
    assert!(!with_calls.into_message().is_final_answer());
}

#[test]
fn test_empty_content_is_dropped() {
    let turn = AssistantTurn {
        content: Some(String::new()),
        tool_calls: vec![ToolCall::new("list_schemas", serde_json::Value::Null)],
        usage: Usage::default(),
    };

    match turn.into_message() {
        Message::Assistant { content, .. } => assert!(content.is_none()),
        _ => panic!("Expected Assistant"),
    }
}

#[test]
fn test_usage_add() {
    let mut total = Usage::default();
    total.add(Usage {
        input_tokens: 10,
        output_tokens: 4,
    });
    total.add(Usage {
        input_tokens: 5,
        output_tokens: 1,
    });
    assert_eq!(total.input_tokens, 15);
    assert_eq!(total.output_tokens, 5);
}
