use std::time::Duration;

use profilescope_core::{ChatMessage, CompanyJob, Priority};
use profilescope_dispatch::{DispatchError, Dispatcher};
use tokio::time::Instant;

use crate::error::PipelineError;
use crate::prompts::DISCOVERY_SYSTEM_PROMPT;
use crate::search::SearchClient;

const NAO_ENCONTRADO: &str = "nao_encontrado";

fn query_formulations(job: &CompanyJob) -> [String; 2] {
	let name = job.display_name();
	let city = job.city.as_deref().unwrap_or("");
	[format!("{name} {city}").trim().to_string(), format!("{name} CNPJ site oficial")]
}

fn consolidate_prompt(job: &CompanyJob, results: &[crate::search::SearchResult]) -> String {
	let mut body = format!("Company: {}\nSearch results:\n", job.display_name());
	for r in results.iter().take(10) {
		body.push_str(&format!("- {} ({}): {}\n", r.title, r.link, r.snippet));
	}
	body
}

async fn search_both_formulations(job: &CompanyJob, search: &dyn SearchClient) -> Result<Vec<crate::search::SearchResult>, PipelineError> {
	for query in query_formulations(job) {
		if let Ok(results) = search.search(&query).await {
			if !results.is_empty() {
				return Ok(results);
			}
		}
	}
	Err(PipelineError::NoSearchResults)
}

/// The response-format constraint for the discovery decision, per spec.md §4.F
/// step 2: "a response format constraining the decision to either a chosen URL or
/// the literal token nao_encontrado".
fn discovery_response_format() -> serde_json::Value {
	serde_json::json!({"type": "json_object"})
}

async fn ask_dispatcher(dispatcher: &Dispatcher, provider: &str, messages: Vec<ChatMessage>, deadline: Instant) -> Result<String, DispatchError> {
	let content = dispatcher.call(provider, messages, 0.0, Some(discovery_response_format()), Priority::High, deadline).await?.content;
	let parsed: serde_json::Value = serde_json::from_str(&content).map_err(|e| DispatchError::Empty(format!("discovery response was not valid JSON: {e}")))?;
	let site = parsed
		.get("site")
		.and_then(|v| v.as_str())
		.ok_or_else(|| DispatchError::Empty("discovery response missing \"site\" field".into()))?;
	Ok(site.to_string())
}

/// Runs spec.md §4.F's DISCOVER step: two-formulation search, HIGH-priority LLM
/// decision with a `nao_encontrado` sentinel and short timeout + one backup-provider
/// retry, then a liveness probe of the chosen URL.
pub async fn discover(
	job: &CompanyJob,
	search: &dyn SearchClient,
	dispatcher: &Dispatcher,
	provider: &str,
	backup_provider: Option<&str>,
	llm_timeout: Duration,
	http_client: &reqwest::Client,
) -> Result<String, PipelineError> {
	let results = search_both_formulations(job, search).await?;
	let messages = vec![ChatMessage::system(DISCOVERY_SYSTEM_PROMPT), ChatMessage::user(consolidate_prompt(job, &results))];

	let primary = ask_dispatcher(dispatcher, provider, messages.clone(), Instant::now() + llm_timeout).await;
	let content = match primary {
		Ok(content) => content,
		Err(DispatchError::Timeout(_)) if backup_provider.is_some() => {
			let backup = backup_provider.unwrap();
			tracing::warn!(provider, backup, "discovery call timed out, retrying with backup provider");
			ask_dispatcher(dispatcher, backup, messages, Instant::now() + llm_timeout)
				.await
				.map_err(|e| PipelineError::DiscoveryLlmFailed(e.to_string()))?
		}
		Err(e) => return Err(PipelineError::DiscoveryLlmFailed(e.to_string())),
	};

	let chosen = content.trim();
	if chosen.eq_ignore_ascii_case(NAO_ENCONTRADO) {
		return Err(PipelineError::NoUrlFound);
	}
	let url = chosen.split_whitespace().find(|t| t.starts_with("http")).unwrap_or(chosen).to_string();

	probe_liveness(http_client, &url).await?;
	Ok(url)
}

async fn probe_liveness(client: &reqwest::Client, url: &str) -> Result<(), PipelineError> {
	let resp = client
		.get(url)
		.timeout(Duration::from_secs(5))
		.send()
		.await
		.map_err(|e| PipelineError::LivenessFailed(url.to_string(), e.to_string()))?;
	if !resp.status().is_success() && !resp.status().is_redirection() {
		return Err(PipelineError::LivenessFailed(url.to_string(), format!("status {}", resp.status())));
	}
	Ok(())
}
