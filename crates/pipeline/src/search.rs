use async_trait::async_trait;
use serde::Deserialize;

/// One organic search result, per spec.md §6's Serper-style response shape.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
	pub title: String,
	pub link: String,
	pub snippet: String,
}

#[async_trait]
pub trait SearchClient: Send + Sync {
	async fn search(&self, query: &str) -> Result<Vec<SearchResult>, String>;
}

#[derive(Deserialize)]
struct SerperResponse {
	#[serde(default)]
	organic: Vec<SearchResult>,
}

/// Serper-style JSON search backend, per spec.md §6: `POST {q}` returning
/// `{organic:[{title, link, snippet}, ...]}`.
pub struct SerperSearchClient {
	client: reqwest::Client,
	api_key: String,
	endpoint: String,
}

impl SerperSearchClient {
	pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
		Self { client: reqwest::Client::new(), api_key: api_key.into(), endpoint: endpoint.into() }
	}
}

#[async_trait]
impl SearchClient for SerperSearchClient {
	async fn search(&self, query: &str) -> Result<Vec<SearchResult>, String> {
		let resp = self
			.client
			.post(&self.endpoint)
			.header("X-API-KEY", &self.api_key)
			.json(&serde_json::json!({ "q": query }))
			.send()
			.await
			.map_err(|e| e.to_string())?;

		if !resp.status().is_success() {
			return Err(format!("search backend returned {}", resp.status()));
		}
		let parsed: SerperResponse = resp.json().await.map_err(|e| e.to_string())?;
		Ok(parsed.organic)
	}
}
