use profilescope_tokens::{count, dynamic_margin, Tokenizer};

/// Greedily appends pages into groups, cutting a new group whenever the next page
/// would push the running total past that content's *dynamically adjusted* cap, per
/// spec.md §4.D step 4. Bias towards `group_target_tokens` is implicit: `effective_max`
/// is the caller-supplied target, not the hard ceiling, so groups fill up to it before
/// cutting.
pub fn group_pages(pages: &[String], tok: &dyn Tokenizer, effective_max: u64) -> Vec<String> {
	let mut groups = Vec::new();
	let mut current = String::new();
	let mut current_tokens = 0u64;

	for page in pages {
		let page_tokens = count(tok, page);
		let potential_tokens = current_tokens + page_tokens;
		let potential = if current.is_empty() { page.clone() } else { format!("{current}\n\n{page}") };
		let (adjusted_max, _) = dynamic_margin(&potential, potential_tokens, effective_max);

		if potential_tokens > adjusted_max && !current.is_empty() {
			groups.push(std::mem::take(&mut current));
			current_tokens = 0;
		}
		if !current.is_empty() {
			current.push_str("\n\n");
		}
		current.push_str(page);
		current_tokens += page_tokens;
	}

	if !current.is_empty() {
		groups.push(current);
	}
	groups
}

#[cfg(test)]
mod tests {
	use super::*;
	use profilescope_tokens::HeuristicTokenizer;

	#[test]
	fn small_pages_are_merged_into_one_group() {
		let tok = HeuristicTokenizer::new(1);
		let pages = vec!["a".repeat(10), "b".repeat(10)];
		let groups = group_pages(&pages, &tok, 1000);
		assert_eq!(groups.len(), 1);
	}

	#[test]
	fn pages_that_would_overflow_the_cap_start_a_new_group() {
		let tok = HeuristicTokenizer::new(1);
		let pages = vec!["a".repeat(80), "b".repeat(80), "c".repeat(80)];
		let groups = group_pages(&pages, &tok, 100);
		assert!(groups.len() >= 2);
	}

	#[test]
	fn grouping_preserves_page_order() {
		let tok = HeuristicTokenizer::new(1);
		let pages = vec!["first".to_string(), "second".to_string()];
		let groups = group_pages(&pages, &tok, 1000);
		assert_eq!(groups.len(), 1);
		assert!(groups[0].find("first").unwrap() < groups[0].find("second").unwrap());
	}
}
