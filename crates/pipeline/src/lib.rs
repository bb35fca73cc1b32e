//! Pipeline Orchestrator (component F): drives a single company job through
//! `START → (DISCOVER?) → SCRAPE → CHUNK → REDUCE → ASSEMBLE → END`, per spec.md
//! §4.F, composing components A through E behind one job-level deadline.

pub mod discovery;
pub mod error;
pub mod prompts;
pub mod queue;
pub mod reduce;
pub mod search;

use std::sync::Arc;
use std::time::Duration;

use profilescope_chunker::{process_content, ChunkingConfig};
use profilescope_core::telemetry::StepTimer;
use profilescope_core::{CompanyJob, JobResult};
use profilescope_dispatch::Dispatcher;
use profilescope_scraper::Scraper;
use profilescope_tokens::Tokenizer;
use tokio::time::Instant;

pub use error::PipelineError;
pub use queue::{InMemoryJobQueue, JobQueue};
pub use search::{SearchClient, SearchResult, SerperSearchClient};

/// The set of collaborators an [`Orchestrator`] needs, built once in the worker's
/// composition root and shared by `Arc`, per spec.md §9.
pub struct Orchestrator {
	dispatcher: Arc<Dispatcher>,
	scraper: Arc<Scraper>,
	search: Arc<dyn SearchClient>,
	tokenizer: Arc<dyn Tokenizer>,
	chunk_cfg: ChunkingConfig,
	http_client: reqwest::Client,
	discovery_provider: String,
	discovery_backup_provider: Option<String>,
	discovery_timeout: Duration,
	job_deadline: Duration,
	reduction_concurrency: usize,
}

impl Orchestrator {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		dispatcher: Arc<Dispatcher>,
		scraper: Arc<Scraper>,
		search: Arc<dyn SearchClient>,
		tokenizer: Arc<dyn Tokenizer>,
		chunk_cfg: ChunkingConfig,
		discovery_provider: impl Into<String>,
		discovery_backup_provider: Option<String>,
	) -> Self {
		Self {
			dispatcher,
			scraper,
			search,
			tokenizer,
			chunk_cfg,
			http_client: reqwest::Client::new(),
			discovery_provider: discovery_provider.into(),
			discovery_backup_provider,
			discovery_timeout: Duration::from_secs(35),
			job_deadline: Duration::from_secs(300),
			reduction_concurrency: 4,
		}
	}

	pub fn with_job_deadline(mut self, deadline: Duration) -> Self {
		self.job_deadline = deadline;
		self
	}

	pub fn with_reduction_concurrency(mut self, n: usize) -> Self {
		self.reduction_concurrency = n.max(1);
		self
	}

	/// Runs one company job to completion or to its deadline, per spec.md §4.F.
	/// Never panics or propagates a raw error: the job-level deadline and every
	/// component failure are both folded into a [`JobResult`].
	pub async fn run_job(&self, job: &CompanyJob) -> JobResult {
		match tokio::time::timeout(self.job_deadline, self.run_job_inner(job)).await {
			Ok(Ok((profile, step_timings, visited_urls))) => {
				let step_timings = step_timings.into_iter().map(|(name, d)| (name.to_string(), d.as_secs_f64())).collect();
				JobResult::Ok { profile, step_timings, visited_urls }
			}
			Ok(Err(e)) => JobResult::Err(e.into_job_failure()),
			Err(_elapsed) => JobResult::Err(PipelineError::Timeout.into_job_failure()),
		}
	}

	async fn run_job_inner(&self, job: &CompanyJob) -> Result<(serde_json::Value, Vec<(&'static str, Duration)>, Vec<String>), PipelineError> {
		let mut timer = StepTimer::start(job.seed_url.clone().unwrap_or_else(|| job.id.clone()));

		let url = match &job.seed_url {
			Some(seed) => seed.clone(),
			None => {
				let discovered = discovery::discover(
					job,
					self.search.as_ref(),
					&self.dispatcher,
					&self.discovery_provider,
					self.discovery_backup_provider.as_deref(),
					self.discovery_timeout,
					&self.http_client,
				)
				.await?;
				timer.step("discovery");
				discovered
			}
		};

		let outcome = self.scraper.scrape_site(&url).await.map_err(|e| PipelineError::ScrapeEmpty(e.to_string()))?;
		timer.step("scrape");

		let chunks = process_content(&outcome.aggregated_text, self.tokenizer.as_ref(), &self.chunk_cfg);
		timer.step("chunk");

		let profile = if chunks.is_empty() {
			serde_json::json!({})
		} else {
			let total = chunks.len();
			let parts = reduce::reduce_chunks(&self.dispatcher, &chunks, Instant::now() + self.job_deadline, self.reduction_concurrency).await;
			let succeeded = parts.len();
			if (succeeded as f64) < (total as f64) * 0.5 {
				return Err(PipelineError::ReduceInsufficient { succeeded, total });
			}
			reduce::assemble(parts)
		};
		timer.step("llm");

		Ok((profile, timer.finish(), outcome.visited_urls))
	}

	/// Composition-root convenience: dequeue, process, ack/nack, repeat, stopping
	/// once `drain` reports a shutdown in progress.
	pub async fn run_loop(&self, queue: &dyn JobQueue, drain: &profilescope_core::drain::JobHandle) {
		while !drain.draining() {
			match queue.dequeue().await {
				Some(job) => {
					let result = self.run_job(&job).await;
					match &result {
						JobResult::Ok { .. } => queue.ack(&job, &result).await,
						JobResult::Err(failure) => queue.nack(&job, failure).await,
					}
				}
				None => tokio::time::sleep(Duration::from_millis(200)).await,
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use profilescope_dispatch::DEFAULT_HARD_CAP;
	use profilescope_ratelimit::RateLimiter;
	use profilescope_scraper::ScraperConfig;
	use profilescope_tokens::HeuristicTokenizer;

	struct EmptySearch;
	#[async_trait]
	impl SearchClient for EmptySearch {
		async fn search(&self, _query: &str) -> Result<Vec<SearchResult>, String> {
			Ok(vec![])
		}
	}

	fn test_orchestrator() -> Orchestrator {
		let dispatcher = Arc::new(Dispatcher::new(Arc::new(RateLimiter::new()), DEFAULT_HARD_CAP));
		let scraper = Arc::new(Scraper::new(ScraperConfig::default(), vec![]));
		Orchestrator::new(dispatcher, scraper, Arc::new(EmptySearch), Arc::new(HeuristicTokenizer::default()), ChunkingConfig::default(), "primary", None)
			.with_job_deadline(Duration::from_secs(2))
	}

	#[tokio::test]
	async fn missing_seed_url_and_no_search_results_fails_with_no_search_results() {
		let orchestrator = test_orchestrator();
		let job = CompanyJob { id: "1".into(), cnpj: None, trade_name: Some("Acme".into()), legal_name: None, city: None, seed_url: None };
		let result = orchestrator.run_job(&job).await;
		match result {
			JobResult::Err(failure) => assert_eq!(failure.error_kind, "no_search_results"),
			JobResult::Ok { .. } => panic!("expected failure"),
		}
	}

	#[tokio::test]
	async fn unreachable_seed_url_fails_with_scrape_empty() {
		let orchestrator = test_orchestrator();
		let job = CompanyJob { id: "1".into(), cnpj: None, trade_name: None, legal_name: None, city: None, seed_url: Some("http://127.0.0.1:1".into()) };
		let result = orchestrator.run_job(&job).await;
		match result {
			JobResult::Err(failure) => assert_eq!(failure.error_kind, "scrape_empty"),
			JobResult::Ok { .. } => panic!("expected failure"),
		}
	}

	#[tokio::test]
	async fn job_deadline_is_enforced_regardless_of_state() {
		let dispatcher = Arc::new(Dispatcher::new(Arc::new(RateLimiter::new()), DEFAULT_HARD_CAP));
		let scraper = Arc::new(Scraper::new(ScraperConfig::default(), vec![]));
		let orchestrator = Orchestrator::new(dispatcher, scraper, Arc::new(EmptySearch), Arc::new(HeuristicTokenizer::default()), ChunkingConfig::default(), "primary", None)
			.with_job_deadline(Duration::from_millis(1));
		let job = CompanyJob { id: "1".into(), cnpj: None, trade_name: Some("Acme".into()), legal_name: None, city: None, seed_url: None };
		let result = orchestrator.run_job(&job).await;
		match result {
			JobResult::Err(failure) => assert!(failure.error_kind == "pipeline_timeout" || failure.error_kind == "no_search_results"),
			JobResult::Ok { .. } => panic!("expected failure"),
		}
	}
}
