use serde::{Deserialize, Serialize};

/// A company to be profiled, per spec.md §3. Created and destroyed by the external
/// job queue; mutated only by the pipeline orchestrator with its result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyJob {
	pub id: String,
	#[serde(default)]
	pub cnpj: Option<String>,
	#[serde(default)]
	pub trade_name: Option<String>,
	#[serde(default)]
	pub legal_name: Option<String>,
	#[serde(default)]
	pub city: Option<String>,
	#[serde(default)]
	pub seed_url: Option<String>,
}

impl CompanyJob {
	/// Best-effort display name used in discovery search queries and logs.
	pub fn display_name(&self) -> &str {
		self
			.trade_name
			.as_deref()
			.or(self.legal_name.as_deref())
			.unwrap_or(&self.id)
	}
}

/// Which priority class a provider is eligible to serve, per spec.md §4.C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderTier {
	HighOnly,
	NormalOnly,
	Both,
}

impl ProviderTier {
	pub fn serves_high(self) -> bool {
		matches!(self, ProviderTier::HighOnly | ProviderTier::Both)
	}

	pub fn serves_normal(self) -> bool {
		matches!(self, ProviderTier::NormalOnly | ProviderTier::Both)
	}
}

/// Which class of call a dispatcher request belongs to. HIGH fully preempts NORMAL
/// per spec.md §4.C / §5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
	High,
	Normal,
}

/// Static provider configuration loaded at startup, per spec.md §3. Effectively
/// immutable for the lifetime of a worker process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	pub name: String,
	pub api_key: String,
	pub base_url: String,
	pub model: String,
	#[serde(default = "default_max_concurrent")]
	pub max_concurrent: u32,
	#[serde(default = "default_priority_score")]
	pub priority_score: u32,
	#[serde(default = "default_weight")]
	pub weight: u32,
	#[serde(default = "default_timeout_sec")]
	pub timeout_sec: f64,
	#[serde(default = "default_true")]
	pub enabled: bool,
	pub tier: ProviderTier,
}

fn default_max_concurrent() -> u32 {
	100
}
fn default_priority_score() -> u32 {
	50
}
fn default_weight() -> u32 {
	10
}
fn default_timeout_sec() -> f64 {
	90.0
}
fn default_true() -> bool {
	true
}

/// Per-`(provider, model)` limits loaded once at startup, per spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderLimits {
	pub rpm: u64,
	pub tpm: u64,
	pub context_window: u64,
	pub safe_input_tokens: u64,
	pub max_output_tokens: u64,
	#[serde(default = "default_weight")]
	pub weight: u32,
	#[serde(default = "default_safety_margin")]
	pub safety_margin: f64,
}

fn default_safety_margin() -> f64 {
	0.85
}

/// A single chat message in the OpenAI-compatible wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
	pub role: String,
	pub content: String,
}

impl ChatMessage {
	pub fn system(content: impl Into<String>) -> Self {
		Self { role: "system".into(), content: content.into() }
	}
	pub fn user(content: impl Into<String>) -> Self {
		Self { role: "user".into(), content: content.into() }
	}
	pub fn assistant(content: impl Into<String>) -> Self {
		Self { role: "assistant".into(), content: content.into() }
	}
}

/// Output of one scrape invocation, per spec.md §3. Ownership transfers to the
/// orchestrator on return.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeOutcome {
	pub aggregated_text: String,
	pub pdf_links: Vec<String>,
	pub visited_urls: Vec<String>,
	pub per_page_latencies: Vec<(String, f64)>,
}

/// An immutable unit of chunked content ready for a single LLM call, per spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
	pub index: usize,
	pub content: String,
	pub tokens: u64,
	pub source_page_count: usize,
}

/// The terminal structured output. The schema is external to the core; it is carried
/// as opaque JSON, per spec.md §3.
pub type Profile = serde_json::Value;

/// The terminal envelope returned to the job queue, per SPEC_FULL.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobResult {
	Ok {
		profile: Profile,
		step_timings: Vec<(String, f64)>,
		visited_urls: Vec<String>,
	},
	Err(crate::error::JobFailure),
}
