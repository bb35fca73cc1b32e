// Mirrors spec.md §6's configuration surfaces (`chunking.json`, `llm_limits.*`,
// `llm_providers.enabled_providers`, `sglang_targets`) as one YAML file with the
// same key structure, per SPEC_FULL.md §6.

use std::collections::HashMap;

use profilescope_chunker::ChunkingConfig;
use profilescope_core::ProviderLimits;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
	#[serde(default)]
	pub chunking: ChunkingConfig,
	#[serde(default)]
	pub llm_limits: HashMap<String, HashMap<String, ProviderLimits>>,
	#[serde(default)]
	pub llm_providers: LlmProvidersSection,
	/// Read-and-carried per spec.md §6 for the out-of-scope per-instance worker
	/// launcher; this worker process registers providers via `SGLANG_BASE_URL`
	/// instead, so the list itself is never consulted here.
	#[serde(default)]
	#[allow(dead_code)]
	pub sglang_targets: Vec<SglangTarget>,
	pub search_endpoint: Option<String>,
	pub discovery_provider: Option<String>,
	pub discovery_backup_provider: Option<String>,
	pub job_deadline_secs: Option<u64>,
	pub scraper_proxies: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LlmProvidersSection {
	#[serde(default)]
	pub enabled_providers: HashMap<String, bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct SglangTarget {
	pub name: String,
	pub base_url: String,
	#[serde(default)]
	pub workers: u32,
}

fn fallback_limits() -> ProviderLimits {
	ProviderLimits { rpm: 60, tpm: 100_000, context_window: 128_000, safe_input_tokens: 100_000, max_output_tokens: 4_096, weight: 10, safety_margin: 0.85 }
}

/// Reads `{PROVIDER}_TIER` (`high_only` / `normal_only` / `both`, case-insensitive),
/// defaulting to `Both` when unset or unrecognized.
fn tier_from_env(provider_upper: &str) -> profilescope_core::ProviderTier {
	use profilescope_core::ProviderTier;
	use profilescope_core::config::env_str;

	match env_str(&format!("{provider_upper}_TIER")).as_deref().map(str::to_lowercase).as_deref() {
		Some("high_only") => ProviderTier::HighOnly,
		Some("normal_only") => ProviderTier::NormalOnly,
		_ => ProviderTier::Both,
	}
}

/// Resolves the registered-provider set per spec.md §6: when `SGLANG_BASE_URL` is
/// set, the dispatcher pins to *only* that self-hosted instance with no fallback;
/// otherwise every provider named truthy under `llm_providers.enabled_providers` is
/// registered from its `{PROVIDER}_API_KEY`/`{PROVIDER}_BASE_URL`/`{PROVIDER}_MODEL`
/// environment triple.
pub fn resolve_providers(cfg: &FileConfig) -> Vec<(profilescope_core::ProviderDescriptor, ProviderLimits)> {
	use profilescope_core::ProviderDescriptor;
	use profilescope_core::config::env_str;

	if let Some(base_url) = env_str("SGLANG_BASE_URL") {
		let name = env_str("SGLANG_INSTANCE_NAME").unwrap_or_else(|| "sglang".to_string());
		let model = env_str("SGLANG_MODEL").unwrap_or_else(|| name.clone());
		let upper = name.to_uppercase();
		let mut limits = cfg.llm_limits.get(&name).and_then(|models| models.get(&model)).cloned().unwrap_or_else(fallback_limits);
		// Self-hosted OpenAI-compatible backend: safe_input_tokens is always derived
		// from context_window, per spec.md line 91, never taken as-is from config.
		limits.safe_input_tokens = (limits.context_window as f64 * 0.8) as u64;
		let descriptor = ProviderDescriptor {
			name: name.clone(),
			api_key: env_str(&format!("{upper}_API_KEY")).unwrap_or_default(),
			base_url,
			model,
			max_concurrent: 100,
			priority_score: 50,
			weight: limits.weight,
			timeout_sec: 90.0,
			enabled: true,
			tier: tier_from_env(&upper),
		};
		return vec![(descriptor, limits)];
	}

	cfg
		.llm_providers
		.enabled_providers
		.iter()
		.filter(|(_, enabled)| **enabled)
		.filter_map(|(name, _)| {
			let upper = name.to_uppercase();
			let api_key = env_str(&format!("{upper}_API_KEY"))?;
			let base_url = env_str(&format!("{upper}_BASE_URL"))?;
			let model = env_str(&format!("{upper}_MODEL"))?;
			let limits = cfg.llm_limits.get(name).and_then(|models| models.get(&model)).cloned().unwrap_or_else(fallback_limits);
			Some((
				ProviderDescriptor {
					name: name.clone(),
					api_key,
					base_url,
					model,
					max_concurrent: 100,
					priority_score: 50,
					weight: limits.weight,
					timeout_sec: 90.0,
					enabled: true,
					tier: tier_from_env(&upper),
				},
				limits,
			))
		})
		.collect()
}
