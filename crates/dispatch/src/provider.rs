use profilescope_core::{ProviderDescriptor, ProviderLimits};
use profilescope_tokens::{HeuristicTokenizer, TiktokenTokenizer, Tokenizer};
use tokio::sync::Semaphore;

/// Assumed per-call latency used to translate an RPM budget into a concurrency
/// ceiling; spec.md §4.C names the formula but not this constant, so it is pinned
/// here (see DESIGN.md's Open Question log) to a conservative typical LLM round trip.
const BASELINE_LATENCY_S: f64 = 2.0;

/// Minimum semaphore width regardless of how thin the RPM budget is, so a
/// low-RPM provider is never starved down to zero concurrency.
const CONCURRENCY_FLOOR: u32 = 1;

/// Resolves `min(hard_cap, max(floor, rpm × safety_margin / baseline_latency_s))`,
/// per spec.md §4.C.
pub fn semaphore_width(rpm: u64, safety_margin: f64, hard_cap: u32) -> u32 {
	let ideal = (rpm as f64 * safety_margin / BASELINE_LATENCY_S).floor() as i64;
	let ideal = ideal.max(CONCURRENCY_FLOOR as i64) as u32;
	ideal.min(hard_cap)
}

/// Everything the dispatcher needs to call one configured provider: its static
/// descriptor, its rate/context limits, a concurrency semaphore sized from those
/// limits, and the tokenizer used for its pre-flight context-window check.
pub struct ProviderEntry {
	pub descriptor: ProviderDescriptor,
	pub limits: ProviderLimits,
	pub semaphore: Semaphore,
	pub tokenizer: Box<dyn Tokenizer>,
}

impl ProviderEntry {
	pub fn new(descriptor: ProviderDescriptor, limits: ProviderLimits, hard_cap: u32) -> Self {
		let width = semaphore_width(limits.rpm, limits.safety_margin, hard_cap);
		let tokenizer: Box<dyn Tokenizer> = TiktokenTokenizer::for_model(&descriptor.model)
			.map(|t| Box::new(t) as Box<dyn Tokenizer>)
			.unwrap_or_else(|| Box::new(HeuristicTokenizer::default()));
		Self { descriptor, limits, semaphore: Semaphore::new(width as usize), tokenizer }
	}
}
