//! Wire-translation tests for the four provider adapters: encoding shapes,
//! decoding, and the round-trip laws for correlation and item IDs.

use agentloop::clients::{anthropic, gemini, openai_chat, openai_responses};
use agentloop::{FunctionCall, Message, ReasoningItem, ToolCall};
use serde_json::json;

fn weather_call(call_id: &str) -> ToolCall {
    ToolCall::new(call_id, "get_weather", json!({"city": "北京"}))
}

fn assistant_with_call(call_id: &str) -> Message {
    Message::assistant_turn(
        "Let me check.",
        Some("needs a lookup".to_string()),
        None,
        Some(vec![weather_call(call_id)]),
    )
}

// ───────────────────────── Anthropic ─────────────────────────

#[test]
fn anthropic_lifts_system_and_orders_assistant_blocks() {
    let messages = [
        Message::system("S"),
        Message::user("北京天气"),
        assistant_with_call("c1"),
        Message::tool("get_weather", "c1", "sunny 25C"),
    ];

    let (system, wire) = anthropic::encode_messages(&messages);
    assert_eq!(system.as_deref(), Some("S"));
    assert_eq!(wire.len(), 3);

    assert_eq!(wire[0], json!({"role": "user", "content": "北京天气"}));

    let blocks = wire[1]["content"].as_array().unwrap();
    assert_eq!(blocks[0]["type"], json!("thinking"));
    assert_eq!(blocks[0]["thinking"], json!("needs a lookup"));
    assert_eq!(blocks[1]["type"], json!("text"));
    assert_eq!(blocks[2]["type"], json!("tool_use"));
    assert_eq!(blocks[2]["id"], json!("c1"));
    assert_eq!(blocks[2]["input"], json!({"city": "北京"}));

    // Tool results travel as user messages with a single tool_result block.
    assert_eq!(wire[2]["role"], json!("user"));
    let result_block = &wire[2]["content"][0];
    assert_eq!(result_block["type"], json!("tool_result"));
    assert_eq!(result_block["tool_use_id"], json!("c1"));
    assert_eq!(result_block["content"], json!("sunny 25C"));
}

#[test]
fn anthropic_decode_accumulates_blocks_and_sums_usage() {
    let wire = json!({
        "id": "msg_01",
        "content": [
            {"type": "thinking", "thinking": "the user wants weather"},
            {"type": "text", "text": "Checking now."},
            {"type": "tool_use", "id": "toolu_1", "name": "get_weather", "input": {"city": "北京"}}
        ],
        "stop_reason": "tool_use",
        "usage": {"input_tokens": 12, "output_tokens": 8}
    });

    let response = anthropic::decode_response(&wire).unwrap();
    assert_eq!(response.content, "Checking now.");
    assert_eq!(response.thinking.as_deref(), Some("the user wants weather"));
    assert_eq!(response.finish_reason.as_deref(), Some("tool_use"));
    assert_eq!(response.response_id.as_deref(), Some("msg_01"));

    let usage = response.usage.as_ref().unwrap();
    assert_eq!(usage.total_tokens, 20);

    // The provider's single ID doubles as the correlation ID…
    let calls = response.tool_calls.as_ref().unwrap();
    assert_eq!(calls[0].call_id, "toolu_1");

    // …and survives re-encoding (round-trip law).
    let turn = Message::assistant_turn(
        response.content,
        response.thinking,
        response.reasoning_items,
        response.tool_calls,
    );
    let (_, wire) = anthropic::encode_messages(&[turn]);
    assert_eq!(wire[0]["content"][2]["id"], json!("toolu_1"));
}

// ───────────────────── Chat Completions ─────────────────────

#[test]
fn chat_stringifies_arguments_and_nulls_empty_content() {
    let messages = [
        Message::system("S"),
        Message::user("hi"),
        Message::assistant_turn("", None, None, Some(vec![weather_call("call_1")])),
        Message::tool("get_weather", "call_1", "sunny"),
    ];

    let wire = openai_chat::encode_messages(&messages);
    assert_eq!(wire[0]["role"], json!("system"));

    let assistant = &wire[2];
    assert!(assistant["content"].is_null());
    let call = &assistant["tool_calls"][0];
    assert_eq!(call["id"], json!("call_1"));
    assert_eq!(call["type"], json!("function"));
    let arguments: serde_json::Value =
        serde_json::from_str(call["function"]["arguments"].as_str().unwrap()).unwrap();
    assert_eq!(arguments, json!({"city": "北京"}));

    assert_eq!(
        wire[3],
        json!({"role": "tool", "tool_call_id": "call_1", "content": "sunny"})
    );
}

#[test]
fn chat_decode_parses_arguments_and_skips_non_function_calls() {
    let wire = json!({
        "id": "chatcmpl-1",
        "choices": [{
            "finish_reason": "tool_calls",
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [
                    {"id": "call_9", "type": "custom", "custom": {}},
                    {
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": "{\"city\":\"北京\"}"}
                    }
                ]
            }
        }],
        "usage": {"prompt_tokens": 7, "completion_tokens": 3, "total_tokens": 10}
    });

    let response = openai_chat::decode_response(&wire).unwrap();
    assert_eq!(response.content, "");
    assert!(response.thinking.is_none());
    assert_eq!(response.finish_reason.as_deref(), Some("tool_calls"));

    let calls = response.tool_calls.as_ref().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].call_id, "call_1");
    assert_eq!(calls[0].function.arguments, json!({"city": "北京"}));

    // Round-trip: the correlation ID survives re-encoding.
    let turn = Message::assistant_turn("", None, None, response.tool_calls);
    let wire = openai_chat::encode_messages(&[turn]);
    assert_eq!(wire[0]["tool_calls"][0]["id"], json!("call_1"));
}

#[test]
fn chat_decode_propagates_malformed_argument_json() {
    let wire = json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "f", "arguments": "{not json"}
                }]
            }
        }]
    });
    assert!(openai_chat::decode_response(&wire).is_err());
}

// ──────────────────────── Responses ────────────────────────

#[test]
fn responses_expands_assistant_turns_into_ordered_items() {
    let turn = Message::assistant_turn(
        "Done.",
        Some("because".to_string()),
        Some(vec![ReasoningItem {
            id: "rs_1".to_string(),
            summary: "because".to_string(),
        }]),
        Some(vec![ToolCall {
            id: Some("fc_1".to_string()),
            call_id: "call_1".to_string(),
            function: FunctionCall {
                name: "get_weather".to_string(),
                arguments: json!({"city": "北京"}),
            },
        }]),
    );
    let messages = [
        Message::system("S"),
        Message::user("hi"),
        turn,
        Message::tool("get_weather", "call_1", "sunny"),
    ];

    let (instructions, input) = openai_responses::encode_messages(&messages);
    assert_eq!(instructions.as_deref(), Some("S"));

    // user message, reasoning, function_call, assistant message, output.
    assert_eq!(input.len(), 5);
    assert_eq!(input[1]["type"], json!("reasoning"));
    assert_eq!(input[1]["id"], json!("rs_1"));
    assert_eq!(input[2]["type"], json!("function_call"));
    assert_eq!(input[2]["id"], json!("fc_1"));
    assert_eq!(input[2]["call_id"], json!("call_1"));
    assert!(input[2]["arguments"].is_string());
    assert_eq!(input[3]["type"], json!("message"));
    assert_eq!(input[3]["role"], json!("assistant"));
    assert_eq!(input[4]["type"], json!("function_call_output"));
    assert_eq!(input[4]["call_id"], json!("call_1"));
}

#[test]
fn responses_round_trips_reasoning_and_both_call_ids() {
    let wire = json!({
        "id": "resp_1",
        "status": "completed",
        "output": [
            {
                "type": "reasoning",
                "id": "rs_1",
                "summary": [{"type": "summary_text", "text": "thinking it through"}]
            },
            {
                "type": "function_call",
                "id": "fc_1",
                "call_id": "call_1",
                "name": "get_weather",
                "arguments": "{\"city\":\"北京\"}"
            },
            {
                "type": "message",
                "role": "assistant",
                "content": [{"type": "output_text", "text": "On it."}]
            }
        ],
        "usage": {"input_tokens": 9, "output_tokens": 4, "total_tokens": 13}
    });

    let response = openai_responses::decode_response(&wire).unwrap();
    assert_eq!(response.content, "On it.");
    assert_eq!(response.thinking.as_deref(), Some("thinking it through"));
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    assert_eq!(response.response_id.as_deref(), Some("resp_1"));

    let items = response.reasoning_items.clone().unwrap();
    assert_eq!(items[0].id, "rs_1");
    let calls = response.tool_calls.clone().unwrap();
    assert_eq!(calls[0].id.as_deref(), Some("fc_1"));
    assert_eq!(calls[0].call_id, "call_1");

    // encode ∘ decode preserves the reasoning ID and both call IDs.
    let turn = Message::assistant_turn(
        response.content,
        response.thinking,
        response.reasoning_items,
        response.tool_calls,
    );
    let (_, input) = openai_responses::encode_messages(&[turn]);
    assert_eq!(input[0]["id"], json!("rs_1"));
    assert_eq!(input[1]["id"], json!("fc_1"));
    assert_eq!(input[1]["call_id"], json!("call_1"));
}

#[test]
fn responses_maps_statuses_onto_finish_reasons() {
    for (status, expected) in [
        ("completed", "stop"),
        ("incomplete", "length"),
        ("failed", "error"),
        ("cancelled", "cancelled"),
    ] {
        let wire = json!({"status": status, "output": []});
        let response = openai_responses::decode_response(&wire).unwrap();
        assert_eq!(response.finish_reason.as_deref(), Some(expected));
    }
}

// ───────────────────────── Gemini ─────────────────────────

#[test]
fn gemini_encodes_thought_part_before_function_call() {
    let turn = Message::assistant_turn(
        "",
        Some("…".to_string()),
        None,
        Some(vec![ToolCall::new("c1", "f", json!({"x": 1}))]),
    );

    let (_, contents) = gemini::encode_messages(&[turn]);
    assert_eq!(contents[0]["role"], json!("model"));
    let parts = contents[0]["parts"].as_array().unwrap();
    assert_eq!(parts[0], json!({"text": "…", "thought": true}));
    assert_eq!(
        parts[1],
        json!({"functionCall": {"name": "f", "args": {"x": 1}, "id": "c1"}})
    );
}

#[test]
fn gemini_degenerate_assistant_still_emits_one_part() {
    let (_, contents) = gemini::encode_messages(&[Message::assistant("")]);
    assert_eq!(contents[0]["parts"], json!([{"text": ""}]));
}

#[test]
fn gemini_routes_tool_results_through_user_role() {
    let messages = [
        Message::system("S"),
        Message::user("hi"),
        Message::tool("f", "c1", "done"),
    ];
    let (system_instruction, contents) = gemini::encode_messages(&messages);
    assert_eq!(
        system_instruction.unwrap(),
        json!({"parts": [{"text": "S"}]})
    );

    assert_eq!(contents[1]["role"], json!("user"));
    let response_part = &contents[1]["parts"][0]["functionResponse"];
    assert_eq!(response_part["id"], json!("c1"));
    assert_eq!(response_part["name"], json!("f"));
    assert_eq!(response_part["response"]["result"], json!("done"));
}

#[test]
fn gemini_decode_splits_thought_parts_and_keeps_call_ids() {
    let wire = json!({
        "responseId": "r1",
        "candidates": [{
            "finishReason": "STOP",
            "content": {"parts": [
                {"text": "pondering", "thought": true},
                {"text": "All set."},
                {"functionCall": {"name": "f", "args": {"x": 1}, "id": "c1"}}
            ]}
        }],
        "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 2, "totalTokenCount": 7}
    });

    let response = gemini::decode_response(&wire).unwrap();
    assert_eq!(response.thinking.as_deref(), Some("pondering"));
    assert_eq!(response.content, "All set.");
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    assert_eq!(response.usage.as_ref().unwrap().total_tokens, 7);
    assert_eq!(response.tool_calls.as_ref().unwrap()[0].call_id, "c1");
}

#[test]
fn gemini_synthesizes_missing_call_ids() {
    let wire = json!({
        "candidates": [{
            "content": {"parts": [
                {"functionCall": {"name": "f", "args": {}}}
            ]}
        }]
    });

    let response = gemini::decode_response(&wire).unwrap();
    let call_id = &response.tool_calls.as_ref().unwrap()[0].call_id;

    // Shape: gemini_call_{timestamp}_{part_index}
    let rest = call_id
        .strip_prefix("gemini_call_")
        .expect("fallback prefix");
    let (timestamp, part_index) = rest.split_once('_').expect("two segments");
    assert!(timestamp.chars().all(|c| c.is_ascii_digit()) && !timestamp.is_empty());
    assert_eq!(part_index, "0");
}
