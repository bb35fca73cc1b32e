use tokio::time::{Duration, Instant};

/// A lazy-refill token bucket, per spec.md §3/§4.B: `current_level` is clamped into
/// `[0, capacity]` at all times (invariant 1 of spec.md §8), and refill is computed on
/// demand from elapsed wall time rather than via a background task.
pub struct TokenBucket {
	capacity: f64,
	refill_rate_per_sec: f64,
	current_level: f64,
	last_refill: Instant,
}

impl TokenBucket {
	pub fn new(capacity: f64, refill_rate_per_sec: f64) -> Self {
		Self {
			capacity,
			refill_rate_per_sec,
			current_level: capacity,
			last_refill: Instant::now(),
		}
	}

	/// Adds `elapsed × refill_rate` tokens, clamped to `capacity`, and advances the
	/// refill clock. Must be called (with the caller's lock held) before any
	/// `try_take`/`wait_for` to keep the level current.
	pub fn refill(&mut self, now: Instant) {
		if now <= self.last_refill {
			return;
		}
		let elapsed = now.duration_since(self.last_refill).as_secs_f64();
		self.current_level = (self.current_level + elapsed * self.refill_rate_per_sec).min(self.capacity);
		self.last_refill = now;
	}

	/// Deducts `amount` if available, returning whether it succeeded.
	pub fn try_take(&mut self, amount: f64) -> bool {
		if self.current_level >= amount {
			self.current_level -= amount;
			true
		} else {
			false
		}
	}

	/// Restores `amount` to the bucket (used to undo a `try_take` when a sibling
	/// bucket in the same acquire turned out to be insufficient), clamped to capacity.
	pub fn give_back(&mut self, amount: f64) {
		self.current_level = (self.current_level + amount).min(self.capacity);
	}

	/// How long until `amount` tokens will be available, assuming no further
	/// withdrawals. Zero if already available.
	pub fn wait_for(&self, amount: f64) -> Duration {
		let deficit = amount - self.current_level;
		if deficit <= 0.0 || self.refill_rate_per_sec <= 0.0 {
			return Duration::ZERO;
		}
		Duration::from_secs_f64(deficit / self.refill_rate_per_sec)
	}

	pub fn level(&self) -> f64 {
		self.current_level
	}

	pub fn capacity(&self) -> f64 {
		self.capacity
	}
}
