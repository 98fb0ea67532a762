// ABOUTME: Trace rendering - turns a finished transcript into display events.
// ABOUTME: Pure; reads the transcript and never touches tools or the model.

use std::fmt;

use serde::Serialize;

use crate::llm::Message;

/// One line of a rendered trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DisplayEvent {
    ToolInvoked {
        name: String,
        arguments: serde_json::Value,
    },
    ToolCompleted {
        name: String,
        result: String,
        is_error: bool,
    },
    FinalAnswer {
        content: String,
    },
}

impl fmt::Display for DisplayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToolInvoked { name, arguments } => {
                write!(f, "-> Invoking tool: {} with {}", name, arguments)
            }
            Self::ToolCompleted {
                name,
                result,
                is_error: false,
            } => write!(f, "<- Tool result from {}: {}", name, result),
            Self::ToolCompleted { name, result, .. } => {
                write!(f, "!! Tool error from {}: {}", name, result)
            }
            Self::FinalAnswer { content } => write!(f, "== Final answer:\n{}", content),
        }
    }
}

/// Render `transcript` into events, in transcript order.
///
/// An assistant message with tool calls yields one `ToolInvoked` per call.
/// An assistant message without tool calls is a final answer, even an empty
/// one, so a finished run always ends with a terminal event. User messages
/// produce nothing.
pub fn render(transcript: &[Message]) -> Vec<DisplayEvent> {
    let mut events = Vec::new();

    for message in transcript {
        match message {
            Message::User { .. } => {}
            Message::Assistant {
                content,
                tool_calls,
            } => {
                if tool_calls.is_empty() {
                    events.push(DisplayEvent::FinalAnswer {
                        content: content.clone().unwrap_or_default(),
                    });
                    continue;
                }
                events.extend(tool_calls.iter().map(|call| DisplayEvent::ToolInvoked {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                }));
            }
            Message::ToolResult {
                tool_name,
                content,
                is_error,
                ..
            } => events.push(DisplayEvent::ToolCompleted {
                name: tool_name.clone(),
                result: content.clone(),
                is_error: *is_error,
            }),
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;
    use crate::tool::ToolResult;
    use serde_json::json;

    fn math_transcript() -> Vec<Message> {
        let add = ToolCall::new("add", json!({"a": 2, "b": 3})).with_id("call_1");
        let multiply = ToolCall::new("multiply", json!({"a": 5, "b": 4})).with_id("call_2");
        vec![
            Message::user("What is (2 + 3) * 4?"),
            Message::Assistant {
                content: None,
                tool_calls: vec![add.clone()],
            },
            Message::tool_result(&add, ToolResult::text("5")),
            Message::Assistant {
                content: Some("Now multiplying.".into()),
                tool_calls: vec![multiply.clone()],
            },
            Message::tool_result(&multiply, ToolResult::text("20")),
            Message::assistant("The answer is 20."),
        ]
    }

    #[test]
    fn test_render_math_transcript() {
        let events = render(&math_transcript());

        assert_eq!(
            events,
            vec![
                DisplayEvent::ToolInvoked {
                    name: "add".into(),
                    arguments: json!({"a": 2, "b": 3}),
                },
                DisplayEvent::ToolCompleted {
                    name: "add".into(),
                    result: "5".into(),
                    is_error: false,
                },
                DisplayEvent::ToolInvoked {
                    name: "multiply".into(),
                    arguments: json!({"a": 5, "b": 4}),
                },
                DisplayEvent::ToolCompleted {
                    name: "multiply".into(),
                    result: "20".into(),
                    is_error: false,
                },
                DisplayEvent::FinalAnswer {
                    content: "The answer is 20.".into(),
                },
            ]
        );
    }

    #[test]
    fn test_render_is_pure() {
        let transcript = math_transcript();
        let before = transcript.clone();
        assert_eq!(render(&transcript), render(&transcript));
        assert_eq!(transcript, before);
    }

    #[test]
    fn test_render_edge_cases() {
        assert!(render(&[]).is_empty());
        assert!(render(&[Message::user("hi")]).is_empty());

    }

    #[test]
    fn test_empty_answer_is_still_terminal() {
        let silent = Message::Assistant {
            content: None,
            tool_calls: Vec::new(),
        };
        let blank = Message::Assistant {
            content: Some(String::new()),
            tool_calls: Vec::new(),
        };

        for message in [silent, blank] {
            let events = render(&[Message::user("hi"), message]);
            assert_eq!(
                events,
                vec![DisplayEvent::FinalAnswer {
                    content: String::new()
                }]
            );
        }
    }

    #[test]
    fn test_multiple_calls_in_one_step() {
        let list = ToolCall::new("list_schemas", json!({})).with_id("call_1");
        let denied = ToolCall::new("task", json!({"description": "x"})).with_id("call_2");
        let transcript = vec![
            Message::Assistant {
                content: None,
                tool_calls: vec![list.clone(), denied.clone()],
            },
            Message::tool_result(&list, ToolResult::text("main")),
            Message::tool_result(&denied, ToolResult::error("Tool 'task' is denied by policy")),
        ];

        let events = render(&transcript);
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], DisplayEvent::ToolInvoked { name, .. } if name == "list_schemas"));
        assert!(matches!(&events[1], DisplayEvent::ToolInvoked { name, .. } if name == "task"));
        assert!(matches!(&events[3], DisplayEvent::ToolCompleted { is_error: true, .. }));
    }

    #[test]
    fn test_display_lines() {
        let invoked = DisplayEvent::ToolInvoked {
            name: "add".into(),
            arguments: json!({"a": 2}),
        };
        assert_eq!(invoked.to_string(), r#"-> Invoking tool: add with {"a":2}"#);

        let failed = DisplayEvent::ToolCompleted {
            name: "sql_select".into(),
            result: "timeout".into(),
            is_error: true,
        };
        assert_eq!(failed.to_string(), "!! Tool error from sql_select: timeout");

        let answer = DisplayEvent::FinalAnswer {
            content: "20".into(),
        };
        assert_eq!(answer.to_string(), "== Final answer:\n20");
    }
}
