use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
	Closed,
	Open,
}

struct DomainState {
	state: State,
	consecutive_failures: u32,
	opened_at: Option<Instant>,
	skipped_count: u64,
}

impl Default for DomainState {
	fn default() -> Self {
		Self { state: State::Closed, consecutive_failures: 0, opened_at: None, skipped_count: 0 }
	}
}

/// Process-wide per-domain circuit breaker, per spec.md §4.E: trips OPEN after
/// `threshold` consecutive failures, cools down for `cooldown`, and any success while
/// CLOSED resets the failure count to zero.
pub struct CircuitBreaker {
	domains: Mutex<HashMap<String, DomainState>>,
	threshold: u32,
	cooldown: Duration,
}

impl CircuitBreaker {
	pub fn new(threshold: u32, cooldown: Duration) -> Self {
		Self { domains: Mutex::new(HashMap::new()), threshold, cooldown }
	}

	/// Whether `host` may be fetched right now. An OPEN circuit past its cooldown is
	/// transitioned back to CLOSED here (lazily, on the next check) so a success can
	/// then reset it properly.
	pub fn allow(&self, host: &str) -> bool {
		let mut domains = self.domains.lock();
		let entry = domains.entry(host.to_string()).or_default();
		match entry.state {
			State::Closed => true,
			State::Open => {
				let cooled_down = entry.opened_at.map(|t| t.elapsed() >= self.cooldown).unwrap_or(false);
				if cooled_down {
					entry.state = State::Closed;
					entry.consecutive_failures = 0;
					true
				} else {
					entry.skipped_count += 1;
					false
				}
			}
		}
	}

	pub fn record_success(&self, host: &str) {
		let mut domains = self.domains.lock();
		let entry = domains.entry(host.to_string()).or_default();
		if entry.state == State::Closed {
			entry.consecutive_failures = 0;
		}
	}

	pub fn record_failure(&self, host: &str) {
		let mut domains = self.domains.lock();
		let entry = domains.entry(host.to_string()).or_default();
		if entry.state == State::Open {
			return;
		}
		entry.consecutive_failures += 1;
		if entry.consecutive_failures >= self.threshold {
			entry.state = State::Open;
			entry.opened_at = Some(Instant::now());
		}
	}

	pub fn skipped_count(&self, host: &str) -> u64 {
		self.domains.lock().get(host).map(|e| e.skipped_count).unwrap_or(0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn opens_after_threshold_consecutive_failures() {
		let cb = CircuitBreaker::new(3, Duration::from_secs(60));
		for _ in 0..2 {
			cb.record_failure("a.com");
		}
		assert!(cb.allow("a.com"));
		cb.record_failure("a.com");
		assert!(!cb.allow("a.com"));
	}

	#[test]
	fn success_while_closed_resets_failure_count() {
		let cb = CircuitBreaker::new(3, Duration::from_secs(60));
		cb.record_failure("a.com");
		cb.record_failure("a.com");
		cb.record_success("a.com");
		cb.record_failure("a.com");
		cb.record_failure("a.com");
		// two fresh failures after the reset should not trip a threshold of 3.
		assert!(cb.allow("a.com"));
	}

	#[test]
	fn reopens_closed_after_cooldown_elapses() {
		let cb = CircuitBreaker::new(1, Duration::from_millis(10));
		cb.record_failure("a.com");
		assert!(!cb.allow("a.com"));
		std::thread::sleep(Duration::from_millis(20));
		assert!(cb.allow("a.com"));
	}

	#[test]
	fn skipped_count_increments_while_open() {
		let cb = CircuitBreaker::new(1, Duration::from_secs(60));
		cb.record_failure("a.com");
		cb.allow("a.com");
		cb.allow("a.com");
		assert_eq!(cb.skipped_count("a.com"), 2);
	}

	#[test]
	fn domains_are_independent() {
		let cb = CircuitBreaker::new(1, Duration::from_secs(60));
		cb.record_failure("a.com");
		assert!(!cb.allow("a.com"));
		assert!(cb.allow("b.com"));
	}
}
