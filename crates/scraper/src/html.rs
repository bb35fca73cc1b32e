use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Parses `html`, drops non-content tags (`script, style, nav, footer, svg`), and
/// serializes the remainder as clean, blank-stripped lines, per spec.md §4.E's
/// text-extraction step.
pub fn extract_text(html: &str) -> String {
	let document = Html::parse_document(html);
	let drop = Selector::parse("script, style, nav, footer, svg").unwrap();
	let dropped: HashSet<_> = document.select(&drop).flat_map(|el| el.descendants().map(|n| n.id())).collect();

	let mut lines = Vec::new();
	for node in document.root_element().descendants() {
		if dropped.contains(&node.id()) {
			continue;
		}
		if let Some(text) = node.value().as_text() {
			let trimmed = text.trim();
			if !trimmed.is_empty() {
				lines.push(trimmed.to_string());
			}
		}
	}
	lines.join("\n")
}

/// Extracts same-domain internal links and PDF links from `html`, resolved against
/// `base_url`, per spec.md §4.E.
pub fn extract_links(html: &str, base_url: &Url) -> (HashSet<String>, HashSet<String>) {
	let document = Html::parse_document(html);
	let anchors = Selector::parse("a[href]").unwrap();
	let mut pdfs = HashSet::new();
	let mut internal = HashSet::new();

	for el in document.select(&anchors) {
		let Some(href) = el.value().attr("href") else { continue };
		let Ok(resolved) = base_url.join(href) else { continue };
		if resolved.path().to_lowercase().ends_with(".pdf") {
			pdfs.insert(resolved.to_string());
		} else if resolved.host_str() == base_url.host_str() {
			internal.insert(resolved.to_string());
		}
	}
	(pdfs, internal)
}

/// Wraps extracted page text with the `--- PAGE START/END ---` sentinels the
/// chunker splits on, per spec.md §4.E.
pub fn wrap_page(url: &str, text: &str) -> String {
	format!("--- PAGE START: {url} ---\n{text}\n--- PAGE END ---\n")
}
