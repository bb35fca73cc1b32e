mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use profilescope_core::config::{env_str, load_yaml, parse_env};
use profilescope_core::{drain, signal};
use profilescope_dispatch::{Dispatcher, DEFAULT_HARD_CAP};
use profilescope_pipeline::{InMemoryJobQueue, Orchestrator, SerperSearchClient};
use profilescope_ratelimit::RateLimiter;
use profilescope_scraper::{Scraper, ScraperConfig};
use profilescope_tokens::{HeuristicTokenizer, TiktokenTokenizer, Tokenizer};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
	/// Path to the worker's YAML configuration file.
	#[arg(long)]
	config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
	profilescope_core::telemetry::init();
	let args = Args::parse();

	let file_cfg: config::FileConfig = match load_yaml(args.config.as_deref()) {
		Ok(cfg) => cfg,
		Err(e) => {
			tracing::error!(error = %e, "failed to load configuration");
			std::process::exit(1);
		}
	};

	let hard_cap = parse_env::<u32>("LLM_CONCURRENCY_HARD_CAP").ok().flatten().unwrap_or(DEFAULT_HARD_CAP);
	let limiter = Arc::new(RateLimiter::new());
	let dispatcher = Arc::new(Dispatcher::new(limiter, hard_cap));

	let providers = config::resolve_providers(&file_cfg);
	if providers.is_empty() {
		tracing::warn!("no LLM providers registered; discovery and reduction calls will fail");
	}
	let mut tokenizer: Arc<dyn Tokenizer> = Arc::new(HeuristicTokenizer::default());
	for (descriptor, limits) in providers {
		if let Some(tok) = TiktokenTokenizer::for_model(&descriptor.model) {
			tokenizer = Arc::new(tok);
		}
		dispatcher.register(descriptor, limits).await;
	}

	let scraper = Arc::new(Scraper::new(ScraperConfig::default(), file_cfg.scraper_proxies.clone().unwrap_or_default()));

	let search_endpoint = file_cfg.search_endpoint.clone().unwrap_or_else(|| "https://google.serper.dev/search".to_string());
	let search = Arc::new(SerperSearchClient::new(env_str("SERPER_API_KEY").unwrap_or_default(), search_endpoint));

	let discovery_provider = file_cfg.discovery_provider.clone().unwrap_or_default();
	let orchestrator = Orchestrator::new(dispatcher, scraper, search, tokenizer, file_cfg.chunking.clone(), discovery_provider, file_cfg.discovery_backup_provider.clone())
		.with_job_deadline(Duration::from_secs(file_cfg.job_deadline_secs.unwrap_or(300)));

	let queue = InMemoryJobQueue::new(vec![]);
	let (drain_signal, job_handle) = drain::new();
	let shutdown = signal::Shutdown::new();

	let run_handle = tokio::spawn(async move {
		orchestrator.run_loop(&queue, &job_handle).await;
	});

	shutdown.wait().await;
	drain_signal.start_drain_and_wait(Duration::from_secs(30), || !run_handle.is_finished()).await;
	tracing::info!("worker shut down");
}
