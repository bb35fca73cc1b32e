pub mod circuit;
pub mod error;
pub mod fetch;
pub mod html;
pub mod links;
pub mod proxy;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use profilescope_core::ScrapeOutcome;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

pub use circuit::CircuitBreaker;
pub use error::ScrapeError;
pub use proxy::ProxyRing;

/// Tunables for [`Scraper`], per spec.md §4.E.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
	pub soft_404_min_chars: usize,
	pub max_subpages: usize,
	pub subpage_concurrency: usize,
	pub site_concurrency: usize,
	pub circuit_failure_threshold: u32,
	pub circuit_cooldown: Duration,
}

impl Default for ScraperConfig {
	fn default() -> Self {
		Self {
			soft_404_min_chars: 200,
			max_subpages: 20,
			subpage_concurrency: 10,
			site_concurrency: 5,
			circuit_failure_threshold: 3,
			circuit_cooldown: Duration::from_secs(300),
		}
	}
}

/// The process-wide scraper: owns the circuit breaker, proxy ring, and the two
/// concurrency gates (per-site, global-site-count) named in spec.md §5's shared
/// resource table. Built once in the worker's composition root and shared by `Arc`.
pub struct Scraper {
	config: ScraperConfig,
	proxies: Arc<ProxyRing>,
	circuit: Arc<CircuitBreaker>,
	site_gate: Semaphore,
	site_waiters: AtomicU64,
}

impl Scraper {
	pub fn new(config: ScraperConfig, proxies: Vec<String>) -> Self {
		let site_gate = Semaphore::new(config.site_concurrency);
		let circuit = Arc::new(CircuitBreaker::new(config.circuit_failure_threshold, config.circuit_cooldown));
		Self { config, proxies: Arc::new(ProxyRing::new(proxies)), circuit, site_gate, site_waiters: AtomicU64::new(0) }
	}

	/// How many callers have had to wait for a free site-concurrency slot, per
	/// spec.md §4.E's "a metric counts the waits".
	pub fn site_wait_count(&self) -> u64 {
		self.site_waiters.load(Ordering::Relaxed)
	}

	/// Scrapes `url` end to end: the main-page cascade, subpage discovery and
	/// bounded-concurrency fetch, text extraction, and page-sentinel aggregation.
	pub async fn scrape_site(&self, url: &str) -> Result<ScrapeOutcome, ScrapeError> {
		let base_url = Url::parse(url).map_err(|e| ScrapeError::InvalidUrl(e.to_string()))?;
		let host = base_url.host_str().unwrap_or_default().to_string();

		let waiting = self.site_gate.available_permits() == 0;
		if waiting {
			self.site_waiters.fetch_add(1, Ordering::Relaxed);
		}
		let _permit = self.site_gate.acquire().await.expect("site semaphore never closed");

		let start = std::time::Instant::now();
		let Some(main_html) = self.fetch_main_page(url, &host).await else {
			return Err(ScrapeError::MainPageUnreachable(url.to_string()));
		};
		let main_latency = start.elapsed().as_secs_f64();

		let main_text = html::extract_text(&main_html);
		let (mut pdf_links, internal_links) = html::extract_links(&main_html, &base_url);
		let mut aggregated = html::wrap_page(url, &main_text);
		let mut visited = vec![url.to_string()];
		let mut latencies = vec![(url.to_string(), main_latency)];

		let subpages = links::prioritize_links(&internal_links, url, self.config.max_subpages);
		let subpage_results = self.fetch_subpages(subpages, &base_url).await;
		for (link, page_html, latency) in subpage_results {
			let text = html::extract_text(&page_html);
			let (page_pdfs, _) = html::extract_links(&page_html, &base_url);
			pdf_links.extend(page_pdfs);
			aggregated.push_str(&html::wrap_page(&link, &text));
			visited.push(link.clone());
			latencies.push((link, latency));
		}

		Ok(ScrapeOutcome {
			aggregated_text: aggregated,
			pdf_links: pdf_links.into_iter().collect(),
			visited_urls: visited,
			per_page_latencies: latencies,
		})
	}

	/// Runs the three-tier cascade for the main page only. Subpages never use tier 1
	/// (JS-capable), per spec.md §4.E's "never JS-render subpages".
	async fn fetch_main_page(&self, url: &str, host: &str) -> Option<String> {
		if !self.circuit.allow(host) {
			return None;
		}

		let proxy = self.proxies.next_proxy().map(str::to_string);
		if let Ok(body) = fetch::fetch_js(url, proxy.as_deref()).await {
			if self.is_substantial(&body) {
				self.circuit.record_success(host);
				return Some(body);
			}
		}

		let proxy = self.proxies.next_proxy().map(str::to_string);
		if let Ok(body) = fetch::fetch_impersonated(url, proxy.as_deref()).await {
			if self.is_substantial(&body) {
				self.circuit.record_success(host);
				return Some(body);
			}
		}

		let proxy = self.proxies.next_proxy().map(str::to_string);
		if let Ok(body) = fetch::fetch_curl(url, proxy.as_deref()).await {
			if self.is_substantial(&body) {
				self.circuit.record_success(host);
				return Some(body);
			}
		}

		self.circuit.record_failure(host);
		None
	}

	/// Fetches subpages under a bounded concurrency semaphore, skipping any whose
	/// host's circuit is OPEN. Failures are swallowed per spec.md §4.E: "the pipeline
	/// continues with whatever succeeded".
	async fn fetch_subpages(&self, links: Vec<String>, base_url: &Url) -> Vec<(String, String, f64)> {
		let subpage_gate = Arc::new(Semaphore::new(self.config.subpage_concurrency));
		let host = base_url.host_str().unwrap_or_default().to_string();
		let mut set = JoinSet::new();

		for link in links {
			let gate = subpage_gate.clone();
			let circuit = self.circuit.clone();
			let proxies = self.proxies.clone();
			let host = host.clone();
			let min_chars = self.config.soft_404_min_chars;
			set.spawn(async move {
				let _permit = gate.acquire().await.expect("subpage semaphore never closed");
				if !circuit.allow(&host) {
					return None;
				}
				let start = std::time::Instant::now();
				let proxy = proxies.next_proxy().map(str::to_string);
				let first = fetch::fetch_impersonated(&link, proxy.as_deref()).await;
				let substantial = |b: &String| html::extract_text(b).len() >= min_chars;
				let body = match first {
					Ok(body) if substantial(&body) => Some(body),
					_ => {
						let proxy = proxies.next_proxy().map(str::to_string);
						fetch::fetch_curl(&link, proxy.as_deref()).await.ok().filter(substantial)
					}
				};
				match body {
					Some(body) => {
						circuit.record_success(&host);
						Some((link, body, start.elapsed().as_secs_f64()))
					}
					None => {
						circuit.record_failure(&host);
						None
					}
				}
			});
		}

		let mut out = Vec::new();
		while let Some(joined) = set.join_next().await {
			if let Ok(Some(result)) = joined {
				out.push(result);
			}
		}
		out
	}

	fn is_substantial(&self, body: &str) -> bool {
		html::extract_text(body).len() >= self.config.soft_404_min_chars
	}
}
