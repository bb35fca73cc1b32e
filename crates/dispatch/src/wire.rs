use profilescope_core::ChatMessage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OpenAI-compatible chat completion request body, per spec.md §6. Kept as a small
/// hand-rolled struct rather than pulling in a full client SDK: the dispatcher only
/// ever speaks one request/response shape, against whichever backend is configured.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
	pub model: String,
	pub messages: Vec<ChatMessage>,
	pub temperature: f64,
	pub max_tokens: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub response_format: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
	#[serde(default)]
	pub choices: Vec<Choice>,
	pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
	pub message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
	#[serde(default)]
	pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage {
	pub prompt_tokens: u64,
	#[serde(default)]
	pub completion_tokens: u64,
}

/// The reinforcement instruction appended to the last user message when a provider
/// rejects `response_format` but the caller asked for JSON, per spec.md §4.C.
pub const JSON_REINFORCEMENT: &str =
	"Return only a valid JSON object; no markdown, no prose.";
