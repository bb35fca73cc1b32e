use futures::stream::{self, StreamExt};
use profilescope_core::{ChatMessage, Chunk, Priority};
use profilescope_dispatch::Dispatcher;
use serde_json::{Map, Value};
use tokio::time::Instant;

use crate::prompts::{MULTI_CHUNK_SYSTEM_PROMPT, SINGLE_CHUNK_SYSTEM_PROMPT};

/// REDUCE: calls the dispatcher at NORMAL priority once per chunk, under a small
/// bounded parallelism so the scraper stays the bottleneck rather than the LLM
/// queue, per spec.md §4.F. Returns only the chunks that succeeded, keyed by index.
pub async fn reduce_chunks(dispatcher: &Dispatcher, chunks: &[Chunk], deadline: Instant, concurrency: usize) -> Vec<(usize, Value)> {
	let system_prompt = if chunks.len() <= 1 { SINGLE_CHUNK_SYSTEM_PROMPT } else { MULTI_CHUNK_SYSTEM_PROMPT };

	let results = stream::iter(chunks.iter().cloned())
		.map(|chunk| async move {
			let messages = vec![ChatMessage::system(system_prompt), ChatMessage::user(chunk.content)];
			let provider = dispatcher.weighted_selection(1, Priority::Normal).await.into_iter().next()?;
			let response_format = Some(serde_json::json!({"type": "json_object"}));
			match dispatcher.call(&provider, messages, 0.0, response_format, Priority::Normal, deadline).await {
				Ok(outcome) => serde_json::from_str::<Value>(&outcome.content).ok().map(|v| (chunk.index, v)),
				Err(e) => {
					tracing::warn!(chunk = chunk.index, error = %e, "chunk reduction failed");
					None
				}
			}
		})
		.buffer_unordered(concurrency.max(1))
		.collect::<Vec<_>>()
		.await;

	results.into_iter().flatten().collect()
}

/// ASSEMBLE: scalar fields prefer the non-empty value from the earliest chunk; list
/// fields union-deduplicate across chunks, per spec.md §4.F.
pub fn assemble(mut parts: Vec<(usize, Value)>) -> Value {
	parts.sort_by_key(|(index, _)| *index);
	let mut merged = Map::new();

	for (_, value) in parts {
		let Some(obj) = value.as_object() else { continue };
		for (key, val) in obj {
			if let Value::Array(items) = val {
				let entry = merged.entry(key.clone()).or_insert_with(|| Value::Array(Vec::new()));
				if let Value::Array(existing) = entry {
					for item in items {
						if !existing.contains(item) {
							existing.push(item.clone());
						}
					}
				}
			} else if !is_empty_value(val) && merged.get(key).map(is_empty_value).unwrap_or(true) {
				merged.insert(key.clone(), val.clone());
			}
		}
	}

	Value::Object(merged)
}

fn is_empty_value(v: &Value) -> bool {
	matches!(v, Value::Null) || v.as_str().is_some_and(str::is_empty)
}
