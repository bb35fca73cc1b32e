use crate::config::ChunkingConfig;
use profilescope_tokens::{count, Tokenizer};

/// Re-measures a grouped chunk including the full system-prompt and message-formatting
/// overhead, and truncates iteratively at 90% of its length until it fits under
/// `max_chunk_tokens`, per spec.md §4.D's Validation step. Returns `None` — logging an
/// error event — if truncation alone cannot make it fit (the chunk would have to
/// shrink to nothing).
pub fn validate_and_fit(content: String, tok: &dyn Tokenizer, cfg: &ChunkingConfig) -> Option<String> {
	let total = |c: &str| count(tok, c) + cfg.system_prompt_overhead + cfg.message_overhead;

	if total(&content) <= cfg.max_chunk_tokens {
		return Some(content);
	}

	let mut candidate = content;
	loop {
		let shrunk_len = (candidate.chars().count() as f64 * 0.9) as usize;
		if shrunk_len < cfg.min_chunk_chars {
			tracing::error!(
				chars = candidate.chars().count(),
				"chunk could not be truncated to fit max_chunk_tokens, dropping"
			);
			return None;
		}
		candidate = candidate.chars().take(shrunk_len).collect();
		if total(&candidate) <= cfg.max_chunk_tokens {
			return Some(candidate);
		}
	}
}
