use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
	#[error("transport: {0}")]
	Transport(String),
	#[error("http status {0}")]
	Status(u16),
}

const JS_TIER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";
const IMPERSONATED_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn build_client(proxy: Option<&str>, timeout: Duration) -> Result<reqwest::Client, FetchError> {
	let mut builder = reqwest::Client::builder().timeout(timeout);
	if let Some(proxy) = proxy {
		let proxy = reqwest::Proxy::all(proxy).map_err(|e| FetchError::Transport(e.to_string()))?;
		builder = builder.proxy(proxy);
	}
	builder.build().map_err(|e| FetchError::Transport(e.to_string()))
}

async fn get_with_ua(url: &str, proxy: Option<&str>, user_agent: &str, timeout: Duration) -> Result<String, FetchError> {
	let client = build_client(proxy, timeout)?;
	let resp = client
		.get(url)
		.header("User-Agent", user_agent)
		.header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
		.send()
		.await
		.map_err(|e| FetchError::Transport(e.to_string()))?;

	let status = resp.status();
	if !status.is_success() {
		return Err(FetchError::Status(status.as_u16()));
	}
	resp.text().await.map_err(|e| FetchError::Transport(e.to_string()))
}

/// Tier 1: best-effort JS-capable fetch, per spec.md §4.E. This crate has no
/// headless-browser engine (SPEC_FULL.md §4.E: "best-effort static-HTML fetch"); the
/// tier is distinguished from tier 2 only by user-agent/header profile and timeout
/// budget, not by an actual browser engine.
pub async fn fetch_js(url: &str, proxy: Option<&str>) -> Result<String, FetchError> {
	get_with_ua(url, proxy, JS_TIER_UA, Duration::from_secs(30)).await
}

/// Tier 2: impersonated HTTP fetch with a browser-like header profile, per
/// spec.md §4.E.
pub async fn fetch_impersonated(url: &str, proxy: Option<&str>) -> Result<String, FetchError> {
	get_with_ua(url, proxy, IMPERSONATED_UA, Duration::from_secs(25)).await
}

/// Tier 3: raw HTTP via the `curl` CLI, as a last resort to bypass library-level
/// restrictions, per spec.md §4.E and `original_source/app/services/scraper.py`'s
/// `_system_curl_scrape`.
pub async fn fetch_curl(url: &str, proxy: Option<&str>) -> Result<String, FetchError> {
	let mut cmd = tokio::process::Command::new("curl");
	cmd.args(["-L", "-k", "-s"]);
	if let Some(proxy) = proxy {
		cmd.args(["-x", proxy]);
	}
	cmd.args(["-H", &format!("User-Agent: {JS_TIER_UA}"), url]);

	let output = tokio::time::timeout(Duration::from_secs(35), cmd.output())
		.await
		.map_err(|_| FetchError::Transport("curl timed out".into()))?
		.map_err(|e| FetchError::Transport(e.to_string()))?;

	if !output.status.success() || output.stdout.is_empty() {
		return Err(FetchError::Transport(format!("curl exited with {:?}", output.status.code())));
	}
	Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
