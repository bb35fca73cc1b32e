use serde::{Deserialize, Serialize};

/// The error taxonomy from spec.md §7, shared by every component so the orchestrator
/// can make one consistent retry/fail decision regardless of which layer raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// Retry locally: connection errors, 5xx, malformed-but-recoverable responses.
	Transient,
	/// Rate/quota exhausted: back off and prefer a different provider.
	Exhausted,
	/// Fatal to this attempt: bad request, schema violation, context window exceeded.
	Fatal,
	/// Unbounded latency: retry with backoff up to a configured attempt count.
	Timeout,
	/// An external collaborator returned nothing usable: fail the job.
	External,
}

impl ErrorKind {
	/// Whether `call_with_retry`-style callers should retry this kind at all.
	pub fn retryable(self) -> bool {
		matches!(self, ErrorKind::Transient | ErrorKind::Timeout)
	}
}

/// The terminal, user-visible surface of a job per spec.md §7: categorical only, no
/// stack traces leak past this boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobFailure {
	pub error_kind: String,
	pub message: String,
	pub failed_step: String,
}

impl JobFailure {
	pub fn new(error_kind: impl Into<String>, message: impl Into<String>, failed_step: impl Into<String>) -> Self {
		Self {
			error_kind: error_kind.into(),
			message: message.into(),
			failed_step: failed_step.into(),
		}
	}
}
