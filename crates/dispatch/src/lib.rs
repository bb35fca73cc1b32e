//! Provider Dispatcher (component C): turns a logical "send these messages to the
//! LLM" into a concrete provider call, respecting priority, concurrency, rate
//! limits, context-window safety, and typed failure modes. Grounded on the
//! teacher's `crates/agentgateway/src/llm` request/response split, simplified to a
//! single hand-rolled OpenAI-compatible wire shape (see `wire.rs`) since this
//! dispatcher only ever needs to speak to one kind of backend, not proxy many.

mod error;
mod provider;
mod wire;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::time::Instant;

pub use error::DispatchError;
use profilescope_core::{ChatMessage, Priority, ProviderDescriptor, ProviderLimits};
use profilescope_ratelimit::RateLimiter;
use profilescope_tokens::count_messages;
pub use provider::semaphore_width;
use provider::ProviderEntry;
use rand::Rng;
use tokio::sync::{Notify, RwLock};
pub use wire::{ChatCompletionRequest, ChatCompletionResponse};

/// Default concurrency ceiling applied to every provider's semaphore, per spec.md
/// §6's `LLM_CONCURRENCY_HARD_CAP`.
pub const DEFAULT_HARD_CAP: u32 = 32;

/// Result of a successful dispatcher call: the model's text content and observed
/// latency, per spec.md §4.C.
#[derive(Debug)]
pub struct CallOutcome {
	pub content: String,
	pub latency_ms: f64,
}

/// Process-wide dispatcher singleton. One per worker; holds every registered
/// provider's semaphore and tokenizer, the shared rate limiter, and the HIGH/NORMAL
/// priority gate.
pub struct Dispatcher {
	client: reqwest::Client,
	limiter: Arc<RateLimiter>,
	providers: RwLock<HashMap<String, Arc<ProviderEntry>>>,
	hard_cap: u32,
	high_inflight: AtomicU32,
	high_drained: Notify,
}

impl Dispatcher {
	pub fn new(limiter: Arc<RateLimiter>, hard_cap: u32) -> Self {
		Self {
			client: reqwest::Client::new(),
			limiter,
			providers: RwLock::new(HashMap::new()),
			hard_cap,
			high_inflight: AtomicU32::new(0),
			high_drained: Notify::new(),
		}
	}

	/// Registers a provider's descriptor and limits, sizing its semaphore and
	/// registering its RPM/TPM buckets with the rate limiter. Safe to call again to
	/// replace a provider's configuration.
	pub async fn register(&self, descriptor: ProviderDescriptor, limits: ProviderLimits) {
		self.limiter.register(&descriptor.name, limits.rpm, limits.tpm);
		let entry = Arc::new(ProviderEntry::new(descriptor.clone(), limits, self.hard_cap));
		self.providers.write().await.insert(descriptor.name.clone(), entry);
	}

	async fn entry(&self, provider: &str) -> Option<Arc<ProviderEntry>> {
		self.providers.read().await.get(provider).cloned()
	}

	/// `safe_input_tokens(provider)`: the pre-flight context-window ceiling, per
	/// spec.md §4.C.
	pub async fn safe_input_tokens(&self, provider: &str) -> Option<u64> {
		self.entry(provider).await.map(|e| e.limits.safe_input_tokens)
	}

	/// Proportional-to-weight sample of `k` registered provider names, shuffled, over
	/// providers both enabled and eligible to serve `priority`, per spec.md §4.C's
	/// `weighted_selection` and the GLOSSARY's "NORMAL-eligible backends" scoping.
	pub async fn weighted_selection(&self, k: usize, priority: Priority) -> Vec<String> {
		let providers = self.providers.read().await;
		let mut pool: Vec<(String, u32)> = providers
			.values()
			.filter(|e| e.descriptor.enabled)
			.filter(|e| match priority {
				Priority::High => e.descriptor.tier.serves_high(),
				Priority::Normal => e.descriptor.tier.serves_normal(),
			})
			.map(|e| (e.descriptor.name.clone(), e.descriptor.weight.max(1)))
			.collect();
		drop(providers);

		let mut rng = rand::rng();
		let mut chosen = Vec::with_capacity(k.min(pool.len()));
		while !pool.is_empty() && chosen.len() < k {
			let total: u32 = pool.iter().map(|(_, w)| *w).sum();
			let mut pick = rng.random_range(0..total.max(1));
			let mut idx = 0;
			for (i, (_, w)) in pool.iter().enumerate() {
				if pick < *w {
					idx = i;
					break;
				}
				pick -= *w;
			}
			chosen.push(pool.remove(idx).0);
		}
		chosen
	}

	/// While any HIGH call is in flight, NORMAL callers suspend here before doing
	/// their network round trip — the priority gate from spec.md §4.C/§5.
	async fn await_high_drained(&self) {
		loop {
			if self.high_inflight.load(Ordering::SeqCst) == 0 {
				return;
			}
			let notified = self.high_drained.notified();
			if self.high_inflight.load(Ordering::SeqCst) == 0 {
				return;
			}
			notified.await;
		}
	}

	/// `call(provider, messages, temperature, response_format?, priority, deadline)`,
	/// per spec.md §4.C. Applies the priority gate, rate limiter, per-provider
	/// semaphore, pre-flight context check, and structured-output fallback in that
	/// order, exactly as specified.
	pub async fn call(
		&self,
		provider: &str,
		messages: Vec<ChatMessage>,
		temperature: f64,
		response_format: Option<serde_json::Value>,
		priority: Priority,
		deadline: Instant,
	) -> Result<CallOutcome, DispatchError> {
		if priority == Priority::Normal {
			self.await_high_drained().await;
		} else {
			self.high_inflight.fetch_add(1, Ordering::SeqCst);
		}
		let result = self.call_inner(provider, messages, temperature, response_format, deadline).await;
		if priority == Priority::High && self.high_inflight.fetch_sub(1, Ordering::SeqCst) == 1 {
			self.high_drained.notify_waiters();
		}
		result
	}

	async fn call_inner(
		&self,
		provider: &str,
		messages: Vec<ChatMessage>,
		temperature: f64,
		response_format: Option<serde_json::Value>,
		deadline: Instant,
	) -> Result<CallOutcome, DispatchError> {
		let entry = self
			.entry(provider)
			.await
			.ok_or_else(|| DispatchError::BadRequest(format!("unknown provider {provider}")))?;

		let estimated = count_messages(entry.tokenizer.as_ref(), &messages);
		if estimated > entry.limits.safe_input_tokens {
			return Err(DispatchError::BadRequest(format!(
				"estimated {estimated} tokens exceeds safe_input_tokens {}",
				entry.limits.safe_input_tokens
			)));
		}

		if !self.limiter.acquire(provider, estimated, deadline).await {
			return Err(DispatchError::RateLimit(format!("{provider} rate limiter deadline exceeded")));
		}

		let _permit = tokio::time::timeout_at(deadline, entry.semaphore.acquire())
			.await
			.map_err(|_| DispatchError::Timeout(Duration::from_secs(0)))?
			.map_err(|e| DispatchError::Transport(e.to_string()))?;

		let outcome = self
			.send(&entry, messages.clone(), temperature, response_format.clone(), deadline)
			.await;

		match outcome {
			Err(DispatchError::BadRequest(_)) if response_format.is_some() => {
				tracing::warn!(provider, "response_format rejected, retrying without it");
				let mut reinforced = messages;
				if let Some(last_user) = reinforced.iter_mut().rev().find(|m| m.role == "user") {
					last_user.content.push_str("\n\n");
					last_user.content.push_str(wire::JSON_REINFORCEMENT);
				}
				self.send(&entry, reinforced, temperature, None, deadline).await
			}
			other => other,
		}
	}

	async fn send(
		&self,
		entry: &ProviderEntry,
		messages: Vec<ChatMessage>,
		temperature: f64,
		response_format: Option<serde_json::Value>,
		deadline: Instant,
	) -> Result<CallOutcome, DispatchError> {
		let estimated = count_messages(entry.tokenizer.as_ref(), &messages);
		let body = ChatCompletionRequest {
			model: entry.descriptor.model.clone(),
			messages,
			temperature,
			max_tokens: entry.limits.max_output_tokens,
			response_format,
		};

		let started = Instant::now();
		let timeout = deadline.saturating_duration_since(started);
		let resp = self
			.client
			.post(format!("{}/chat/completions", entry.descriptor.base_url.trim_end_matches('/')))
			.bearer_auth(&entry.descriptor.api_key)
			.timeout(timeout)
			.json(&body)
			.send()
			.await;

		let resp = match resp {
			Ok(r) => r,
			Err(e) if e.is_timeout() => return Err(DispatchError::Timeout(timeout)),
			Err(e) => return Err(DispatchError::Transport(e.to_string())),
		};

		let status = resp.status();
		if status.as_u16() == 429 {
			return Err(DispatchError::RateLimit(format!("provider returned 429 for {}", entry.descriptor.name)));
		}
		if status.is_client_error() {
			let text = resp.text().await.unwrap_or_default();
			return Err(DispatchError::BadRequest(text));
		}
		if status.is_server_error() {
			let text = resp.text().await.unwrap_or_default();
			return Err(DispatchError::Transport(text));
		}

		let parsed: ChatCompletionResponse = resp
			.json()
			.await
			.map_err(|e| DispatchError::Empty(format!("malformed response body: {e}")))?;
		let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

		let content = parsed
			.choices
			.into_iter()
			.next()
			.and_then(|c| c.message.content)
			.filter(|c| !c.is_empty())
			.ok_or_else(|| DispatchError::Empty("no choices or empty content".into()))?;

		if let Some(usage) = parsed.usage {
			let divergence = (usage.prompt_tokens as f64 - estimated as f64).abs() / estimated.max(1) as f64;
			if divergence > 0.10 {
				tracing::warn!(
					provider = entry.descriptor.name,
					estimated,
					actual = usage.prompt_tokens,
					divergence,
					"token estimate diverged from actual usage by more than 10%"
				);
			}
		}

		Ok(CallOutcome { content, latency_ms })
	}

	/// `call_with_retry`: retries only retryable error kinds, with `base × 2^attempt`
	/// backoff, per spec.md §4.C. `BadRequest`/`Empty` propagate immediately.
	#[allow(clippy::too_many_arguments)]
	pub async fn call_with_retry(
		&self,
		provider: &str,
		messages: Vec<ChatMessage>,
		temperature: f64,
		response_format: Option<serde_json::Value>,
		priority: Priority,
		deadline: Instant,
		max_retries: u32,
		base_backoff: Duration,
	) -> Result<CallOutcome, DispatchError> {
		let mut attempt = 0;
		loop {
			let result = self
				.call(provider, messages.clone(), temperature, response_format.clone(), priority, deadline)
				.await;
			match result {
				Ok(outcome) => return Ok(outcome),
				Err(e) if e.retryable() && attempt < max_retries && Instant::now() < deadline => {
					let backoff = base_backoff * 2u32.pow(attempt);
					tracing::warn!(provider, attempt, ?backoff, error = %e, "retrying dispatcher call");
					tokio::time::sleep(backoff.min(deadline.saturating_duration_since(Instant::now()))).await;
					attempt += 1;
				}
				Err(e) => return Err(e),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use profilescope_core::ProviderTier;

	fn descriptor(name: &str, weight: u32) -> ProviderDescriptor {
		ProviderDescriptor {
			name: name.to_string(),
			api_key: "k".into(),
			base_url: "http://127.0.0.1:1".into(),
			model: "gpt-4o".into(),
			max_concurrent: 100,
			priority_score: 50,
			weight,
			timeout_sec: 1.0,
			enabled: true,
			tier: ProviderTier::Both,
		}
	}

	fn limits() -> ProviderLimits {
		ProviderLimits { rpm: 600, tpm: 1_000_000, context_window: 128_000, safe_input_tokens: 100, max_output_tokens: 1000, weight: 10, safety_margin: 0.85 }
	}

	#[tokio::test]
	async fn rejects_prompts_over_safe_input_tokens() {
		let dispatcher = Dispatcher::new(Arc::new(RateLimiter::new()), DEFAULT_HARD_CAP);
		dispatcher.register(descriptor("p1", 10), limits()).await;
		let big = "word ".repeat(10_000);
		let messages = vec![ChatMessage::user(big)];
		let err = dispatcher
			.call("p1", messages, 0.0, None, Priority::Normal, Instant::now() + Duration::from_secs(1))
			.await
			.unwrap_err();
		assert!(matches!(err, DispatchError::BadRequest(_)));
	}

	#[tokio::test]
	async fn unknown_provider_is_bad_request() {
		let dispatcher = Dispatcher::new(Arc::new(RateLimiter::new()), DEFAULT_HARD_CAP);
		let err = dispatcher
			.call("ghost", vec![ChatMessage::user("hi")], 0.0, None, Priority::Normal, Instant::now() + Duration::from_millis(50))
			.await
			.unwrap_err();
		assert!(matches!(err, DispatchError::BadRequest(_)));
	}

	#[tokio::test]
	async fn weighted_selection_only_returns_enabled_providers() {
		let dispatcher = Dispatcher::new(Arc::new(RateLimiter::new()), DEFAULT_HARD_CAP);
		dispatcher.register(descriptor("a", 5), limits()).await;
		let mut disabled = descriptor("b", 5);
		disabled.enabled = false;
		dispatcher.register(disabled, limits()).await;

		let picks = dispatcher.weighted_selection(5, Priority::Normal).await;
		assert_eq!(picks, vec!["a".to_string()]);
	}

	#[tokio::test]
	async fn weighted_selection_excludes_high_only_providers_from_normal_picks() {
		let dispatcher = Dispatcher::new(Arc::new(RateLimiter::new()), DEFAULT_HARD_CAP);
		dispatcher.register(descriptor("normal-capable", 5), limits()).await;
		let mut high_only = descriptor("high-only", 5);
		high_only.tier = ProviderTier::HighOnly;
		dispatcher.register(high_only, limits()).await;

		let picks = dispatcher.weighted_selection(5, Priority::Normal).await;
		assert_eq!(picks, vec!["normal-capable".to_string()]);
	}

	#[tokio::test]
	async fn weighted_selection_excludes_normal_only_providers_from_high_picks() {
		let dispatcher = Dispatcher::new(Arc::new(RateLimiter::new()), DEFAULT_HARD_CAP);
		dispatcher.register(descriptor("high-capable", 5), limits()).await;
		let mut normal_only = descriptor("normal-only", 5);
		normal_only.tier = ProviderTier::NormalOnly;
		dispatcher.register(normal_only, limits()).await;

		let picks = dispatcher.weighted_selection(5, Priority::High).await;
		assert_eq!(picks, vec!["high-capable".to_string()]);
	}

	#[tokio::test]
	async fn weighted_selection_converges_to_provider_weights_over_many_draws() {
		let dispatcher = Dispatcher::new(Arc::new(RateLimiter::new()), DEFAULT_HARD_CAP);
		dispatcher.register(descriptor("heavy", 90), limits()).await;
		dispatcher.register(descriptor("light", 10), limits()).await;

		let mut heavy_hits = 0u32;
		let draws = 2000;
		for _ in 0..draws {
			if dispatcher.weighted_selection(1, Priority::Normal).await == vec!["heavy".to_string()] {
				heavy_hits += 1;
			}
		}

		let observed = heavy_hits as f64 / draws as f64;
		assert!((observed - 0.9).abs() < 0.05, "observed heavy-provider share {observed} should be near 0.9");
	}

	#[tokio::test]
	async fn normal_priority_waits_while_high_in_flight() {
		let dispatcher = Arc::new(Dispatcher::new(Arc::new(RateLimiter::new()), DEFAULT_HARD_CAP));
		dispatcher.high_inflight.fetch_add(1, Ordering::SeqCst);

		let gate = dispatcher.clone();
		let waited = tokio::spawn(async move {
			let started = Instant::now();
			gate.await_high_drained().await;
			started.elapsed()
		});

		tokio::time::sleep(Duration::from_millis(20)).await;
		dispatcher.high_inflight.store(0, Ordering::SeqCst);
		dispatcher.high_drained.notify_waiters();

		let elapsed = waited.await.unwrap();
		assert!(elapsed >= Duration::from_millis(15));
	}

	/// Scenario: a provider rejects `response_format` (a 400) on the first attempt.
	/// The dispatcher must retry once without it, reinforcing the JSON instruction in
	/// the last user message, and succeed on the second attempt.
	#[tokio::test]
	async fn response_format_rejection_retries_once_without_it() {
		use wiremock::matchers::{method, path};
		use wiremock::{Mock, MockServer, ResponseTemplate};

		let server = MockServer::start().await;

		Mock::given(method("POST"))
			.and(path("/chat/completions"))
			.respond_with(move |req: &wiremock::Request| {
				let body: serde_json::Value = req.body_json().unwrap();
				if body.get("response_format").is_some() {
					return ResponseTemplate::new(400).set_body_string("response_format not supported");
				}
				let last_user_content = body["messages"].as_array().unwrap().iter().rev().find(|m| m["role"] == "user").unwrap()["content"].as_str().unwrap().to_string();
				assert!(last_user_content.contains(wire::JSON_REINFORCEMENT), "retried message should carry the reinforcement instruction");
				ResponseTemplate::new(200).set_body_json(serde_json::json!({
					"choices": [{"message": {"content": "{\"ok\": true}"}}],
					"usage": {"prompt_tokens": 5, "completion_tokens": 5}
				}))
			})
			.mount(&server)
			.await;

		let dispatcher = Dispatcher::new(Arc::new(RateLimiter::new()), DEFAULT_HARD_CAP);
		let mut descriptor = descriptor("p1", 10);
		descriptor.base_url = server.uri();
		let mut limits = limits();
		limits.safe_input_tokens = 10_000;
		dispatcher.register(descriptor, limits).await;

		let outcome = dispatcher
			.call(
				"p1",
				vec![ChatMessage::user("extract the company profile as JSON")],
				0.0,
				Some(serde_json::json!({"type": "json_object"})),
				Priority::Normal,
				Instant::now() + Duration::from_secs(5),
			)
			.await
			.unwrap();

		assert_eq!(outcome.content, "{\"ok\": true}");
	}
}
