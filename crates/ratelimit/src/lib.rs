//! Rate Limiter (component B): two independent token-bucket pairs per provider
//! (requests-per-minute and tokens-per-minute), with a fair `acquire` that honors a
//! caller-supplied deadline. Grounded on the lazy-refill token bucket the teacher forks
//! from `rustcommon/ratelimit` in `crates/agentgateway/src/http/localratelimit.rs`,
//! adapted here for cooperative async waiting rather than an immediate try/reject.

mod bucket;

use std::collections::HashMap;
use std::sync::Arc;

pub use bucket::TokenBucket;
use parking_lot::Mutex;
use tokio::time::{Duration, Instant};

/// Per-provider pair of token buckets, per spec.md §3: `rpm_bucket` (capacity = rpm,
/// refill = rpm/60) and `tpm_bucket` (capacity = tpm, refill = tpm/60).
struct ProviderBuckets {
	rpm: Mutex<TokenBucket>,
	tpm: Mutex<TokenBucket>,
}

/// The longest a single cooperative sleep slice may last while waiting for capacity,
/// per spec.md §4.B.
const MAX_SLEEP: Duration = Duration::from_millis(100);

/// Floor applied to a computed wait so an almost-but-not-quite-zero float deficit
/// (e.g. accumulated refill landing a few ULPs short of the target) can't round down
/// to a zero-length sleep and livelock the retry loop without ever advancing.
const MIN_SLEEP: Duration = Duration::from_millis(1);

/// Process-wide rate limiter singleton. Holds one `(rpm, tpm)` bucket pair per provider
/// behind a fine-grained per-provider lock; acquisitions across different providers
/// proceed independently, matching spec.md §4.B's "no shared mutex across providers".
pub struct RateLimiter {
	providers: Mutex<HashMap<String, Arc<ProviderBuckets>>>,
}

impl Default for RateLimiter {
	fn default() -> Self {
		Self::new()
	}
}

impl RateLimiter {
	pub fn new() -> Self {
		Self { providers: Mutex::new(HashMap::new()) }
	}

	/// Registers (or re-registers) a provider's RPM/TPM limits. Safe to call again to
	/// reset a provider's buckets to full capacity.
	pub fn register(&self, provider: &str, rpm: u64, tpm: u64) {
		let buckets = ProviderBuckets {
			rpm: Mutex::new(TokenBucket::new(rpm as f64, rpm as f64 / 60.0)),
			tpm: Mutex::new(TokenBucket::new(tpm as f64, tpm as f64 / 60.0)),
		};
		self
			.providers
			.lock()
			.insert(provider.to_string(), Arc::new(buckets));
	}

	fn get(&self, provider: &str) -> Option<Arc<ProviderBuckets>> {
		self.providers.lock().get(provider).cloned()
	}

	/// Attempts to acquire one request slot and `estimated_tokens` from `provider`'s
	/// buckets before `deadline` elapses. Returns `true` iff both buckets had
	/// sufficient capacity; decrements both immediately on success (no reservation is
	/// held, per spec.md §4.B). Returns `false` — never panics or raises — on timeout
	/// or on an unregistered provider.
	pub async fn acquire(&self, provider: &str, estimated_tokens: u64, deadline: Instant) -> bool {
		let Some(buckets) = self.get(provider) else {
			tracing::warn!(provider, "acquire called for unregistered provider");
			return false;
		};

		loop {
			let now = Instant::now();
			if now >= deadline {
				return false;
			}

			// Lock order is always rpm then tpm to avoid any possibility of deadlock
			// between concurrent acquire calls for the same provider (acquisitions
			// across *different* providers never share a lock at all).
			let wait = {
				let mut rpm = buckets.rpm.lock();
				let mut tpm = buckets.tpm.lock();
				rpm.refill(now);
				tpm.refill(now);

				if rpm.try_take(1.0) {
					if tpm.try_take(estimated_tokens as f64) {
						None
					} else {
						// Give back the RPM token since we didn't actually proceed.
						rpm.give_back(1.0);
						Some(tpm.wait_for(estimated_tokens as f64))
					}
				} else {
					Some(rpm.wait_for(1.0).max(tpm.wait_for(estimated_tokens as f64)))
				}
			};

			let Some(wait) = wait else {
				return true;
			};

			let remaining = deadline.saturating_duration_since(now);
			if remaining.is_zero() {
				return false;
			}
			let sleep = wait.min(remaining).min(MAX_SLEEP).max(remaining.min(MIN_SLEEP));
			tokio::time::sleep(sleep).await;
		}
	}
}
