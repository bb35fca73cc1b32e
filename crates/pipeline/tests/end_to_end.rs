//! Integration tests for the orchestrator's full scenarios, per spec.md §8
//! scenarios 1 and 3: a discovery hit that runs every step through to a merged
//! profile, and an oversize scrape that forces multi-chunk reduction.

use std::sync::Arc;
use std::time::Duration;

use profilescope_chunker::ChunkingConfig;
use profilescope_core::{CompanyJob, JobResult, ProviderDescriptor, ProviderLimits, ProviderTier};
use profilescope_dispatch::{Dispatcher, DEFAULT_HARD_CAP};
use profilescope_pipeline::{Orchestrator, SerperSearchClient};
use profilescope_ratelimit::RateLimiter;
use profilescope_scraper::{Scraper, ScraperConfig};
use profilescope_tokens::HeuristicTokenizer;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn generous_limits() -> ProviderLimits {
	ProviderLimits { rpm: 6_000, tpm: 10_000_000, context_window: 128_000, safe_input_tokens: 100_000, max_output_tokens: 4_096, weight: 10, safety_margin: 0.85 }
}

fn provider_at(base_url: &str) -> ProviderDescriptor {
	ProviderDescriptor {
		name: "primary".into(),
		api_key: "test-key".into(),
		base_url: base_url.to_string(),
		model: "test-model".into(),
		max_concurrent: 100,
		priority_score: 50,
		weight: 10,
		timeout_sec: 30.0,
		enabled: true,
		tier: ProviderTier::Both,
	}
}

async fn orchestrator_with_provider(server: &MockServer, search_endpoint: String) -> Orchestrator {
	let dispatcher = Arc::new(Dispatcher::new(Arc::new(RateLimiter::new()), DEFAULT_HARD_CAP));
	dispatcher.register(provider_at(&server.uri()), generous_limits()).await;
	let scraper = Arc::new(Scraper::new(ScraperConfig::default(), vec![]));
	let search = Arc::new(SerperSearchClient::new("test-key", search_endpoint));
	Orchestrator::new(dispatcher, scraper, search, Arc::new(HeuristicTokenizer::default()), ChunkingConfig::default(), "primary", None)
		.with_job_deadline(Duration::from_secs(30))
}

fn chat_completion_body(content: &str) -> serde_json::Value {
	serde_json::json!({
		"choices": [{"message": {"content": content}}],
		"usage": {"prompt_tokens": 10, "completion_tokens": 10}
	})
}

/// Scenario 1: discovery hit. Search finds the site, the HIGH-priority discovery
/// call returns its URL, the scraper follows one prioritized subpage, and the
/// single resulting chunk reduces to a profile.
#[tokio::test]
async fn discovery_hit_runs_the_full_pipeline_to_a_merged_profile() {
	let server = MockServer::start().await;

	Mock::given(method("POST"))
		.and(path("/search"))
		.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
			"organic": [{"title": "Acme Plasticos", "link": server.uri(), "snippet": "Acme Plasticos official site"}]
		})))
		.mount(&server)
		.await;

	let site_html = format!(
		r#"<html><body><p>{}</p><a href="{}/sobre">Sobre</a></body></html>"#,
		"Acme Plasticos manufactures industrial plastic components for the automotive sector. ".repeat(5),
		server.uri()
	);
	Mock::given(method("GET")).and(path("/")).respond_with(ResponseTemplate::new(200).set_body_string(site_html)).mount(&server).await;
	Mock::given(method("GET"))
		.and(path("/sobre"))
		.respond_with(ResponseTemplate::new(200).set_body_string(
			"<html><body><p>We are a family-owned plastics manufacturer founded in 1985 serving the automotive and appliance industries across southern Brazil. Our facility produces injection-molded components for major regional manufacturers and exports to neighboring countries.</p></body></html>",
		))
		.mount(&server)
		.await;

	let discovery_reply = serde_json::json!({"site": server.uri()}).to_string();
	Mock::given(method("POST"))
		.and(path("/chat/completions"))
		.respond_with(move |req: &wiremock::Request| {
			let body: serde_json::Value = req.body_json().unwrap();
			let system_prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
			let is_discovery = system_prompt == profilescope_pipeline::prompts::DISCOVERY_SYSTEM_PROMPT;
			let content = if is_discovery {
				discovery_reply.clone()
			} else {
				serde_json::json!({"name": "Acme Plasticos", "products": ["injection molding"]}).to_string()
			};
			ResponseTemplate::new(200).set_body_json(chat_completion_body(&content))
		})
		.mount(&server)
		.await;

	let orchestrator = orchestrator_with_provider(&server, format!("{}/search", server.uri())).await;
	let job = CompanyJob { id: "1".into(), cnpj: None, trade_name: Some("Acme Plasticos".into()), legal_name: None, city: Some("Joinville".into()), seed_url: None };

	let result = orchestrator.run_job(&job).await;
	match result {
		JobResult::Ok { profile, visited_urls, step_timings } => {
			assert_eq!(profile["name"], "Acme Plasticos");
			assert!(visited_urls.len() >= 2, "expected the main page plus at least one subpage, got {visited_urls:?}");
			assert!(!step_timings.is_empty());
		}
		JobResult::Err(failure) => panic!("expected a successful profile, got {failure:?}"),
	}
}

/// Scenario 2: discovery miss. An empty search result set fails the job before
/// any LLM or scrape call is made.
#[tokio::test]
async fn discovery_miss_fails_fast_with_no_downstream_calls() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/search"))
		.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"organic": []})))
		.mount(&server)
		.await;

	let orchestrator = orchestrator_with_provider(&server, format!("{}/search", server.uri())).await;
	let job = CompanyJob { id: "1".into(), cnpj: None, trade_name: Some("Acme".into()), legal_name: None, city: Some("Joinville".into()), seed_url: None };

	let result = orchestrator.run_job(&job).await;
	match result {
		JobResult::Err(failure) => assert_eq!(failure.error_kind, "no_search_results"),
		JobResult::Ok { .. } => panic!("expected a failure"),
	}
}

/// Scenario 3: oversize scrape. A seed URL skips discovery; the main page alone
/// carries enough text to require more than one chunk, and every chunk reduces
/// independently.
#[tokio::test]
async fn oversize_scrape_splits_into_multiple_chunks_and_reduces_each() {
	let server = MockServer::start().await;

	let paragraph = "Industrial plastics manufacturing equipment and components for export markets. ".repeat(400);
	let site_html = format!("<html><body><p>{paragraph}</p></body></html>");
	Mock::given(method("GET")).and(path("/")).respond_with(ResponseTemplate::new(200).set_body_string(site_html)).mount(&server).await;

	Mock::given(method("POST"))
		.and(path("/chat/completions"))
		.respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body(&serde_json::json!({"summary": "plastics manufacturer"}).to_string())))
		.mount(&server)
		.await;

	let dispatcher = Arc::new(Dispatcher::new(Arc::new(RateLimiter::new()), DEFAULT_HARD_CAP));
	let mut limits = generous_limits();
	limits.safe_input_tokens = 10_000_000;
	dispatcher.register(provider_at(&server.uri()), limits).await;
	let scraper = Arc::new(Scraper::new(ScraperConfig::default(), vec![]));
	let search = Arc::new(SerperSearchClient::new("unused", format!("{}/search", server.uri())));
	let chunk_cfg = ChunkingConfig { max_chunk_tokens: 2_000, system_prompt_overhead: 100, message_overhead: 50, group_target_tokens: 1_000, ..ChunkingConfig::default() };
	let orchestrator = Orchestrator::new(dispatcher, scraper, search, Arc::new(HeuristicTokenizer::default()), chunk_cfg, "primary", None)
		.with_job_deadline(Duration::from_secs(30))
		.with_reduction_concurrency(8);

	let job = CompanyJob { id: "1".into(), cnpj: None, trade_name: None, legal_name: None, city: None, seed_url: Some(server.uri()) };
	let result = orchestrator.run_job(&job).await;
	match result {
		JobResult::Ok { profile, .. } => assert_eq!(profile["summary"], "plastics manufacturer"),
		JobResult::Err(failure) => panic!("expected a successful profile, got {failure:?}"),
	}
}
