use crate::config::{DedupeConfig, DedupeScope};
use std::collections::HashSet;

/// Deduplicates lines per spec.md §4.D: `document` scope keeps the first occurrence
/// of each line at least `min_line_length` long and drops later repeats;
/// `consecutive` only drops a line that immediately repeats the one before it.
/// Short lines always pass through — they often carry structural punctuation.
pub fn deduplicate(content: &str, cfg: &DedupeConfig) -> String {
	if !cfg.enabled {
		return content.to_string();
	}

	let mut out = String::with_capacity(content.len());
	match cfg.scope {
		DedupeScope::Document => {
			let mut seen = HashSet::new();
			for line in content.lines() {
				let trimmed = line.trim_end();
				if trimmed.len() < cfg.min_line_length || seen.insert(trimmed.to_string()) {
					out.push_str(line);
					out.push('\n');
				}
			}
		}
		DedupeScope::Consecutive => {
			let mut prev: Option<String> = None;
			for line in content.lines() {
				let trimmed = line.trim_end();
				if trimmed.len() < cfg.min_line_length {
					out.push_str(line);
					out.push('\n');
					prev = None;
				} else if prev.as_deref() != Some(trimmed) {
					out.push_str(line);
					out.push('\n');
					prev = Some(trimmed.to_string());
				}
			}
		}
	}
	out
}

/// Strips trailing whitespace from every line and collapses runs of blank lines to
/// at most two consecutive, per spec.md §4.D.
pub fn normalize_whitespace(content: &str) -> String {
	let mut out = String::with_capacity(content.len());
	let mut blank_run = 0;
	for line in content.lines() {
		let trimmed = line.trim_end();
		if trimmed.is_empty() {
			blank_run += 1;
			if blank_run <= 2 {
				out.push('\n');
			}
		} else {
			blank_run = 0;
			out.push_str(trimmed);
			out.push('\n');
		}
	}
	out
}
