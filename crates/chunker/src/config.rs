use serde::{Deserialize, Serialize};

/// Line-deduplication mode, per spec.md §4.D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupeScope {
	Document,
	Consecutive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeConfig {
	#[serde(default = "dedupe_enabled_default")]
	pub enabled: bool,
	#[serde(default = "dedupe_scope_default")]
	pub scope: DedupeScope,
	#[serde(default = "min_line_length_default")]
	pub min_line_length: usize,
}

fn dedupe_enabled_default() -> bool {
	true
}
fn dedupe_scope_default() -> DedupeScope {
	DedupeScope::Document
}
fn min_line_length_default() -> usize {
	5
}

impl Default for DedupeConfig {
	fn default() -> Self {
		Self { enabled: dedupe_enabled_default(), scope: dedupe_scope_default(), min_line_length: min_line_length_default() }
	}
}

/// Mirrors `chunking.json`, per spec.md §6. Defaults match the original source's
/// `ChunkingConfig` dataclass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
	#[serde(default = "max_chunk_tokens_default")]
	pub max_chunk_tokens: u64,
	#[serde(default = "system_prompt_overhead_default")]
	pub system_prompt_overhead: u64,
	#[serde(default = "message_overhead_default")]
	pub message_overhead: u64,
	#[serde(default = "safety_margin_default")]
	pub safety_margin: f64,
	#[serde(default = "group_target_tokens_default")]
	pub group_target_tokens: u64,
	#[serde(default = "min_chunk_chars_default")]
	pub min_chunk_chars: usize,
	#[serde(default)]
	pub dedupe: DedupeConfig,
}

fn max_chunk_tokens_default() -> u64 {
	20_000
}
fn system_prompt_overhead_default() -> u64 {
	2_500
}
fn message_overhead_default() -> u64 {
	200
}
fn safety_margin_default() -> f64 {
	0.85
}
fn group_target_tokens_default() -> u64 {
	12_000
}
fn min_chunk_chars_default() -> usize {
	500
}

impl Default for ChunkingConfig {
	fn default() -> Self {
		Self {
			max_chunk_tokens: max_chunk_tokens_default(),
			system_prompt_overhead: system_prompt_overhead_default(),
			message_overhead: message_overhead_default(),
			safety_margin: safety_margin_default(),
			group_target_tokens: group_target_tokens_default(),
			min_chunk_chars: min_chunk_chars_default(),
			dedupe: DedupeConfig::default(),
		}
	}
}

impl ChunkingConfig {
	/// `(max_chunk_tokens - system_prompt_overhead - message_overhead) * safety_margin`,
	/// per spec.md §4.D. Falls back to 80% of `max_chunk_tokens` if the overhead would
	/// otherwise drive the base below zero.
	pub fn effective_max_tokens(&self) -> u64 {
		let base = self.max_chunk_tokens as i64 - self.system_prompt_overhead as i64 - self.message_overhead as i64;
		let base = if base <= 0 {
			(self.max_chunk_tokens as f64 * 0.8) as u64
		} else {
			base as u64
		};
		(base as f64 * self.safety_margin) as u64
	}

	pub fn group_target_tokens(&self) -> u64 {
		self.group_target_tokens.min(self.effective_max_tokens())
	}
}
