//! Token Accountant (component A): estimates token counts accurately enough to keep
//! requests inside provider limits, and computes the dynamic safety margin that
//! protects against tokenizer-estimation error on large, repetitive scraped text.

mod margin;
mod tokenizer;

pub use margin::{MarginInfo, dynamic_margin, repetition_rate};
pub use tokenizer::{HeuristicTokenizer, TiktokenTokenizer, Tokenizer};

use profilescope_core::ChatMessage;

/// Per-message chat-framing overhead used to approximate the cost of role markers and
/// separators that a raw content-token count would miss, per spec.md §4.A.
pub const MESSAGE_OVERHEAD: u64 = 100;
/// The floor `count_messages` will never return below, per spec.md §4.A.
pub const MIN_MESSAGE_TOKENS: u64 = 100;

/// Counts tokens for free text using whichever tokenizer is configured, with a
/// `count(text) ≥ 1` floor per spec.md §4.A.
pub fn count(tok: &dyn Tokenizer, text: &str) -> u64 {
	tok.count(text).max(1)
}

/// Counts tokens across a list of chat messages, including per-message framing
/// overhead, with a `count_messages(...) ≥ 100` floor per spec.md §4.A.
pub fn count_messages(tok: &dyn Tokenizer, messages: &[ChatMessage]) -> u64 {
	let content_tokens: u64 = messages.iter().map(|m| tok.count(&m.content)).sum();
	let overhead = messages.len() as u64 * MESSAGE_OVERHEAD;
	(content_tokens + overhead).max(MIN_MESSAGE_TOKENS)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn count_floor_is_one() {
		let tok = HeuristicTokenizer::default();
		assert_eq!(count(&tok, ""), 1);
	}

	#[test]
	fn count_messages_floor_is_100() {
		let tok = HeuristicTokenizer::default();
		let msgs = vec![ChatMessage::user("hi")];
		assert_eq!(count_messages(&tok, &msgs), 100);
	}

	#[test]
	fn count_messages_includes_overhead_per_message() {
		let tok = HeuristicTokenizer::default();
		let long = "x".repeat(3000);
		let msgs = vec![ChatMessage::user(long.clone()), ChatMessage::user(long)];
		let expected = tok.count(&"x".repeat(3000)) * 2 + MESSAGE_OVERHEAD * 2;
		assert_eq!(count_messages(&tok, &msgs), expected.max(MIN_MESSAGE_TOKENS));
	}
}
