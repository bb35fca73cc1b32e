//! Content Chunker (component D): given raw concatenated page text, produces an
//! ordered list of chunks each guaranteed to fit within the dispatcher's pre-flight
//! check. Grounded on `original_source/app/core/chunking/preprocessor.py` (dedupe,
//! whitespace) and `app/services/profile_builder/content_chunker.py`'s grouping
//! algorithm — the latter is the module's deprecated legacy entry point in the
//! original, but its page-split/group/validate shape is the only concrete grouping
//! algorithm available in the retrieval pack, so it grounds this module's pipeline
//! (`app/core/chunking/chunker.py`, the non-deprecated successor, was not present in
//! the pack). Only this module-based pipeline is implemented, per SPEC_FULL.md §4.D's
//! Legacy path exclusion.

pub mod config;
mod group;
mod preprocess;
mod split;
mod validate;

pub use config::{ChunkingConfig, DedupeConfig, DedupeScope};
use profilescope_core::Chunk;
use profilescope_tokens::{count, Tokenizer};

/// Full pipeline: preprocess → split into pages → pre-split any oversized page →
/// group pages toward `group_target_tokens` → re-split any group that still exceeds
/// its dynamically adjusted cap → validate/truncate each resulting chunk, per
/// spec.md §4.D.
pub fn process_content(raw_content: &str, tok: &dyn Tokenizer, cfg: &ChunkingConfig) -> Vec<Chunk> {
	let deduped = preprocess::deduplicate(raw_content, &cfg.dedupe);
	let normalized = preprocess::normalize_whitespace(&deduped);

	let effective_max = cfg.effective_max_tokens();
	let pages = split::split_pages(&normalized);

	let mut raw_pages = Vec::with_capacity(pages.len());
	for page in pages {
		if count(tok, &page) > effective_max {
			raw_pages.extend(split::split_oversized_page(&page, tok, effective_max));
		} else {
			raw_pages.push(page);
		}
	}

	let groups = group::group_pages(&raw_pages, tok, cfg.group_target_tokens());

	let mut fitted_groups = Vec::with_capacity(groups.len());
	for group in groups {
		let tokens = count(tok, &group);
		let (adjusted_max, _) = profilescope_tokens::dynamic_margin(&group, tokens, effective_max);
		if tokens > adjusted_max {
			fitted_groups.extend(split::split_oversized_page(&group, tok, adjusted_max));
		} else {
			fitted_groups.push(group);
		}
	}

	let mut chunks = Vec::with_capacity(fitted_groups.len());
	for (i, group) in fitted_groups.into_iter().enumerate() {
		let source_page_count = group.matches("--- PAGE START:").count().max(1);
		if let Some(fitted) = validate::validate_and_fit(group, tok, cfg) {
			let tokens = count(tok, &fitted);
			chunks.push(Chunk { index: i, content: fitted, tokens, source_page_count });
		}
	}

	for (i, chunk) in chunks.iter_mut().enumerate() {
		chunk.index = i;
	}
	chunks
}

#[cfg(test)]
mod tests {
	use super::*;
	use profilescope_tokens::HeuristicTokenizer;

	#[test]
	fn empty_input_yields_no_chunks() {
		let tok = HeuristicTokenizer::new(3);
		let chunks = process_content("", &tok, &ChunkingConfig::default());
		assert!(chunks.is_empty());
	}

	#[test]
	fn small_input_yields_a_single_chunk_under_the_cap() {
		let tok = HeuristicTokenizer::new(3);
		let cfg = ChunkingConfig::default();
		let content = "--- PAGE START: http://a.com ---\nHello there, this is some page content.\n--- PAGE END ---\n";
		let chunks = process_content(content, &tok, &cfg);
		assert_eq!(chunks.len(), 1);
		assert!(chunks[0].tokens <= cfg.max_chunk_tokens);
		assert_eq!(chunks[0].index, 0);
	}

	#[test]
	fn every_emitted_chunk_fits_max_chunk_tokens() {
		let tok = HeuristicTokenizer::new(3);
		let cfg = ChunkingConfig {
			max_chunk_tokens: 2000,
			system_prompt_overhead: 100,
			message_overhead: 50,
			group_target_tokens: 1000,
			..ChunkingConfig::default()
		};
		let mut content = String::new();
		for i in 0..20 {
			content.push_str(&format!(
				"--- PAGE START: http://site.com/{i} ---\n{}\n--- PAGE END ---\n",
				"unique filler sentence number ".repeat(200)
			));
		}
		let chunks = process_content(&content, &tok, &cfg);
		assert!(!chunks.is_empty());
		for chunk in &chunks {
			let full = count(&tok, &chunk.content) + cfg.system_prompt_overhead + cfg.message_overhead;
			assert!(full <= cfg.max_chunk_tokens, "chunk {} has {full} tokens", chunk.index);
		}
	}

	#[test]
	fn duplicate_pages_are_deduplicated_before_chunking() {
		let tok = HeuristicTokenizer::new(3);
		let cfg = ChunkingConfig::default();
		let page = "--- PAGE START: http://a.com ---\nrepeated unique line of text here\n--- PAGE END ---\n";
		let content = page.repeat(3);
		let chunks = process_content(&content, &tok, &cfg);
		assert_eq!(chunks.len(), 1);
		// the repeated page body (not the sentinel lines themselves) should appear once.
		assert_eq!(chunks[0].content.matches("repeated unique line of text here").count(), 1);
	}

	#[test]
	fn chunk_indices_are_contiguous_from_zero() {
		let tok = HeuristicTokenizer::new(3);
		let cfg = ChunkingConfig {
			max_chunk_tokens: 1500,
			system_prompt_overhead: 100,
			message_overhead: 50,
			group_target_tokens: 500,
			..ChunkingConfig::default()
		};
		let mut content = String::new();
		for i in 0..10 {
			content.push_str(&format!(
				"--- PAGE START: http://site.com/{i} ---\n{}\n--- PAGE END ---\n",
				"distinct filler content block ".repeat(150)
			));
		}
		let chunks = process_content(&content, &tok, &cfg);
		for (i, chunk) in chunks.iter().enumerate() {
			assert_eq!(chunk.index, i);
		}
	}

	#[test]
	fn chunking_is_deterministic_for_identical_input_and_config() {
		let tok = HeuristicTokenizer::new(3);
		let cfg = ChunkingConfig {
			max_chunk_tokens: 1500,
			system_prompt_overhead: 100,
			message_overhead: 50,
			group_target_tokens: 500,
			..ChunkingConfig::default()
		};
		let mut content = String::new();
		for i in 0..12 {
			content.push_str(&format!(
				"--- PAGE START: http://site.com/{i} ---\n{}\n--- PAGE END ---\n",
				"deterministic filler content block ".repeat(120)
			));
		}

		let first = process_content(&content, &tok, &cfg);
		let second = process_content(&content, &tok, &cfg);

		assert_eq!(first.len(), second.len());
		for (a, b) in first.iter().zip(second.iter()) {
			assert_eq!(a.index, b.index);
			assert_eq!(a.content, b.content);
			assert_eq!(a.tokens, b.tokens);
			assert_eq!(a.source_page_count, b.source_page_count);
		}
	}
}
