//! Ported from `original_source/app/core/token_utils.py`'s `calculate_repetition_rate`
//! and `calculate_safety_margin`, per spec.md §4.A.

/// `(total_lines − unique_lines) / total_lines`, clamped into `[0, 1]`. Empty content
/// has no repetition.
pub fn repetition_rate(text: &str) -> f64 {
	let lines: Vec<&str> = text.lines().collect();
	if lines.is_empty() {
		return 0.0;
	}
	let total = lines.len();
	let unique = lines.iter().collect::<std::collections::HashSet<_>>().len();
	(total - unique) as f64 / total as f64
}

/// Detail of how a dynamic margin was derived, useful for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginInfo {
	pub repetition_rate: f64,
	pub repetition_margin: f64,
	pub size_margin: f64,
	pub total_margin: f64,
	pub base_effective_max: u64,
	pub adjusted_effective_max: u64,
}

fn repetition_margin(rate: f64) -> f64 {
	if rate > 0.90 {
		0.15
	} else if rate > 0.80 {
		0.10
	} else if rate > 0.70 {
		0.05
	} else {
		0.0
	}
}

fn size_margin(estimated_tokens: u64) -> f64 {
	if estimated_tokens > 80_000 {
		0.25
	} else if estimated_tokens > 75_000 {
		0.20
	} else if estimated_tokens > 70_000 {
		0.15
	} else if estimated_tokens > 60_000 {
		0.10
	} else if estimated_tokens > 50_000 {
		0.05
	} else {
		0.0
	}
}

/// Applies the larger of the repetition-based and size-based margins to
/// `base_effective_max`. If the estimated token count would still exceed the result,
/// widens the margin to the minimum needed plus 5%, capped at 30%, per spec.md §4.A.
pub fn dynamic_margin(content: &str, estimated_tokens: u64, base_effective_max: u64) -> (u64, MarginInfo) {
	let rep_rate = repetition_rate(content);
	let rep_margin = repetition_margin(rep_rate);
	let sz_margin = size_margin(estimated_tokens);
	let mut total_margin = rep_margin.max(sz_margin);

	let mut adjusted = scale_down(base_effective_max, total_margin);

	if estimated_tokens > adjusted && base_effective_max > 0 {
		let required_margin = 1.0 - (estimated_tokens as f64 / base_effective_max as f64);
		let safe_margin = (required_margin + 0.05).min(0.30);
		total_margin = safe_margin;
		adjusted = scale_down(base_effective_max, total_margin);
	}

	(
		adjusted,
		MarginInfo {
			repetition_rate: rep_rate,
			repetition_margin: rep_margin,
			size_margin: sz_margin,
			total_margin,
			base_effective_max,
			adjusted_effective_max: adjusted,
		},
	)
}

fn scale_down(base: u64, margin: f64) -> u64 {
	((base as f64) * (1.0 - margin)) as u64
}
