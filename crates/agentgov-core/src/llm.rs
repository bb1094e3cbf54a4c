// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! LLM adapter contract and a deterministic mock used by tests/the demo.
//!
//! Grounded on `BaseLLM`/`MockLLM` (`agent_platform/execution/llm.py`) — the
//! only out-of-scope collaborator contract spec §1 names explicitly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub prompt: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub context: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct ToolCallRequestedByLlm {
    pub tool_name: String,
    pub parameters: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequestedByLlm>,
    pub tokens_used: i64,
    pub finish_reason: String,
}

pub trait LlmAdapter: Send + Sync {
    fn complete(&self, request: &LlmRequest) -> LlmResponse;
    fn name(&self) -> &str;
}

/// Deterministic mock: replies with a canned response, unless the prompt
/// contains "use tool <name>", in which case it emits a single scripted
/// tool call instead — enough to exercise the runtime's proxy-loop without
/// a real provider.
pub struct MockLlm {
    default_response: String,
    tokens: i64,
    call_count: AtomicU32,
}

impl MockLlm {
    pub fn new(default_response: impl Into<String>, tokens: i64) -> Self {
        Self {
            default_response: default_response.into(),
            tokens,
            call_count: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new("Mock response", 50)
    }
}

impl LlmAdapter for MockLlm {
    fn complete(&self, request: &LlmRequest) -> LlmResponse {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let lower = request.prompt.to_lowercase();
        if let Some(idx) = lower.find("use tool") {
            let tool_name = lower[idx + "use tool".len()..]
                .split_whitespace()
                .next()
                .unwrap_or("mock_tool")
                .to_string();
            return LlmResponse {
                content: String::new(),
                tool_calls: vec![ToolCallRequestedByLlm {
                    tool_name,
                    parameters: HashMap::new(),
                }],
                tokens_used: self.tokens,
                finish_reason: "tool_use".to_string(),
            };
        }
        LlmResponse {
            content: self.default_response.clone(),
            tool_calls: Vec::new(),
            tokens_used: self.tokens,
            finish_reason: "stop".to_string(),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_response_when_no_tool_requested() {
        let llm = MockLlm::default();
        let resp = llm.complete(&LlmRequest {
            prompt: "summarize this".to_string(),
            ..Default::default()
        });
        assert_eq!(resp.finish_reason, "stop");
        assert!(resp.tool_calls.is_empty());
    }

    #[test]
    fn emits_tool_call_when_prompted() {
        let llm = MockLlm::default();
        let resp = llm.complete(&LlmRequest {
            prompt: "please use tool calculator now".to_string(),
            ..Default::default()
        });
        assert_eq!(resp.finish_reason, "tool_use");
        assert_eq!(resp.tool_calls[0].tool_name, "calculator");
    }
}