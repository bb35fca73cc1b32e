use profilescope_tokens::{count, Tokenizer};

const PAGE_SENTINEL: &str = "--- PAGE START:";

/// Splits aggregated scraped text back into its constituent pages using the
/// `--- PAGE START: <url> ---` sentinel the scraper wraps each page in, per
/// spec.md §4.D. A page lacking the sentinel (e.g. test input, or content that
/// wasn't scraper-wrapped) is returned as a single page.
pub fn split_pages(content: &str) -> Vec<String> {
	if !content.contains(PAGE_SENTINEL) {
		return if content.trim().is_empty() { vec![] } else { vec![content.to_string()] };
	}

	let mut pages = Vec::new();
	for (i, part) in content.split(PAGE_SENTINEL).enumerate() {
		if i == 0 {
			if !part.trim().is_empty() {
				pages.push(part.to_string());
			}
			continue;
		}
		pages.push(format!("{PAGE_SENTINEL}{part}"));
	}
	pages
}

/// Splits a page that exceeds `max_tokens` by paragraph, then by line, then —
/// degenerate case — by truncating a too-long line to character count, per
/// spec.md §4.D's "paragraph→line→char-count" cascade.
pub fn split_oversized_page(page: &str, tok: &dyn Tokenizer, max_tokens: u64) -> Vec<String> {
	let mut paragraphs: Vec<&str> = page.split("\n\n").collect();
	if paragraphs.len() == 1 {
		paragraphs = page.split('\n').collect();
	}

	let mut chunks = Vec::new();
	let mut current = String::new();
	let mut current_tokens = 0u64;

	for para in paragraphs {
		let para_tokens = count(tok, para);
		if para_tokens > max_tokens {
			split_by_line(para, tok, max_tokens, &mut chunks, &mut current, &mut current_tokens);
			continue;
		}
		if current_tokens + para_tokens > max_tokens && !current.is_empty() {
			chunks.push(std::mem::take(&mut current));
			current_tokens = 0;
		}
		if !current.is_empty() {
			current.push_str("\n\n");
		}
		current.push_str(para);
		current_tokens += para_tokens;
	}

	if !current.is_empty() {
		chunks.push(current);
	}
	chunks
}

fn split_by_line(para: &str, tok: &dyn Tokenizer, max_tokens: u64, chunks: &mut Vec<String>, current: &mut String, current_tokens: &mut u64) {
	for line in para.lines() {
		let line_tokens = count(tok, line);
		if line_tokens > max_tokens {
			if !current.is_empty() {
				chunks.push(std::mem::take(current));
				*current_tokens = 0;
			}
			let max_chars = (max_tokens as f64 * 2.5) as usize;
			chunks.push(line.chars().take(max_chars).collect());
			continue;
		}
		if *current_tokens + line_tokens > max_tokens && !current.is_empty() {
			chunks.push(std::mem::take(current));
			*current_tokens = 0;
		}
		if !current.is_empty() {
			current.push('\n');
		}
		current.push_str(line);
		*current_tokens += line_tokens;
	}
}
