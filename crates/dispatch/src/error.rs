use thiserror::Error;

/// The five-member error taxonomy for a single dispatcher `call`, per spec.md §4.C.
#[derive(Debug, Error)]
pub enum DispatchError {
	#[error("rate limit: {0}")]
	RateLimit(String),
	#[error("timeout after {0:?}")]
	Timeout(std::time::Duration),
	#[error("transport: {0}")]
	Transport(String),
	#[error("bad request: {0}")]
	BadRequest(String),
	#[error("empty response: {0}")]
	Empty(String),
}

impl DispatchError {
	/// Only `RateLimit`, `Timeout`, and `Transport` are retryable; `BadRequest` and
	/// `Empty` are not, per spec.md §4.C's error taxonomy table.
	pub fn retryable(&self) -> bool {
		matches!(self, DispatchError::RateLimit(_) | DispatchError::Timeout(_) | DispatchError::Transport(_))
	}

	pub fn kind(&self) -> profilescope_core::ErrorKind {
		use profilescope_core::ErrorKind;
		match self {
			DispatchError::RateLimit(_) => ErrorKind::Exhausted,
			DispatchError::Timeout(_) => ErrorKind::Timeout,
			DispatchError::Transport(_) => ErrorKind::Transient,
			DispatchError::BadRequest(_) => ErrorKind::Fatal,
			DispatchError::Empty(_) => ErrorKind::Fatal,
		}
	}
}
