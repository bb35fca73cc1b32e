use tiktoken_rs::CoreBPE;

/// Something that can estimate a token count for a piece of text. Per spec.md §4.A:
/// "if a model-specific tokenizer is available, encode and return length; otherwise
/// divide character count by a configurable chars-per-token constant".
pub trait Tokenizer: Send + Sync {
	fn count(&self, text: &str) -> u64;
}

/// Exact tokenizer backed by `tiktoken-rs`, the BPE tokenizer crate the teacher already
/// depends on for its own LLM token accounting (`crates/agentgateway` uses it to derive
/// `input_tokens` for rate limiting). Used whenever the configured model resolves to a
/// known encoding.
pub struct TiktokenTokenizer {
	bpe: CoreBPE,
}

impl TiktokenTokenizer {
	/// Builds a tokenizer for `model`, e.g. `"gpt-4o"` or `"gpt-4"`. Returns `None` if the
	/// model isn't recognized by tiktoken's built-in model table, in which case callers
	/// should fall back to [`HeuristicTokenizer`].
	pub fn for_model(model: &str) -> Option<Self> {
		tiktoken_rs::get_bpe_from_model(model)
			.ok()
			.map(|bpe| Self { bpe })
	}

	pub fn cl100k() -> anyhow::Result<Self> {
		Ok(Self { bpe: tiktoken_rs::cl100k_base()? })
	}
}

impl Tokenizer for TiktokenTokenizer {
	fn count(&self, text: &str) -> u64 {
		self.bpe.encode_ordinary(text).len() as u64
	}
}

/// Character-count fallback tokenizer: `chars / chars_per_token`, per spec.md §4.A.
/// Used when no model-specific tokenizer is available.
pub struct HeuristicTokenizer {
	pub chars_per_token: usize,
}

impl Default for HeuristicTokenizer {
	fn default() -> Self {
		Self { chars_per_token: 3 }
	}
}

impl HeuristicTokenizer {
	pub fn new(chars_per_token: usize) -> Self {
		Self { chars_per_token: chars_per_token.max(1) }
	}
}

impl Tokenizer for HeuristicTokenizer {
	fn count(&self, text: &str) -> u64 {
		(text.chars().count() / self.chars_per_token) as u64
	}
}
