use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
	#[error("invalid url: {0}")]
	InvalidUrl(String),
	#[error("all main-page fetch strategies failed for {0}")]
	MainPageUnreachable(String),
}

impl ScrapeError {
	pub fn kind(&self) -> profilescope_core::ErrorKind {
		use profilescope_core::ErrorKind;
		match self {
			ScrapeError::InvalidUrl(_) => ErrorKind::Fatal,
			ScrapeError::MainPageUnreachable(_) => ErrorKind::External,
		}
	}
}
