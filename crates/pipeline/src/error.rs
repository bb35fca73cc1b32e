use profilescope_core::{ErrorKind, JobFailure};
use thiserror::Error;

/// Orchestrator-level failures, mapped to the shared taxonomy and a `failed_step`
/// label at the job-result boundary, per spec.md §7.
#[derive(Debug, Error)]
pub enum PipelineError {
	#[error("no search results for either query formulation")]
	NoSearchResults,
	#[error("discovery llm call failed: {0}")]
	DiscoveryLlmFailed(String),
	#[error("discovery model returned nao_encontrado")]
	NoUrlFound,
	#[error("liveness probe failed for {0}: {1}")]
	LivenessFailed(String, String),
	#[error("scrape yielded no usable content: {0}")]
	ScrapeEmpty(String),
	#[error("only {succeeded}/{total} chunks reduced successfully")]
	ReduceInsufficient { succeeded: usize, total: usize },
	#[error("job deadline exceeded")]
	Timeout,
}

impl PipelineError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			PipelineError::NoSearchResults => ErrorKind::External,
			PipelineError::DiscoveryLlmFailed(_) => ErrorKind::Fatal,
			PipelineError::NoUrlFound => ErrorKind::External,
			PipelineError::LivenessFailed(..) => ErrorKind::External,
			PipelineError::ScrapeEmpty(_) => ErrorKind::External,
			PipelineError::ReduceInsufficient { .. } => ErrorKind::External,
			PipelineError::Timeout => ErrorKind::Timeout,
		}
	}

	pub fn failed_step(&self) -> &'static str {
		match self {
			PipelineError::NoSearchResults | PipelineError::DiscoveryLlmFailed(_) | PipelineError::NoUrlFound | PipelineError::LivenessFailed(..) => "discovery",
			PipelineError::ScrapeEmpty(_) => "scrape",
			PipelineError::ReduceInsufficient { .. } => "reduce",
			PipelineError::Timeout => "total",
		}
	}

	/// Converts to the categorical error kind the error kind name spec.md §7 mandates:
	/// `discovery_llm_failed` / `no_search_results` / `scrape_empty` /
	/// `reduce_insufficient` / `pipeline_timeout`.
	pub fn error_kind_name(&self) -> &'static str {
		match self {
			PipelineError::NoSearchResults => "no_search_results",
			PipelineError::DiscoveryLlmFailed(_) => "discovery_llm_failed",
			PipelineError::NoUrlFound => "no_search_results",
			PipelineError::LivenessFailed(..) => "discovery_llm_failed",
			PipelineError::ScrapeEmpty(_) => "scrape_empty",
			PipelineError::ReduceInsufficient { .. } => "reduce_insufficient",
			PipelineError::Timeout => "pipeline_timeout",
		}
	}

	pub fn into_job_failure(self) -> JobFailure {
		JobFailure::new(self.error_kind_name(), self.to_string(), self.failed_step())
	}
}
