use std::collections::VecDeque;

use async_trait::async_trait;
use profilescope_core::{CompanyJob, JobFailure, JobResult};
use tokio::sync::Mutex;

/// The external job queue boundary from spec.md §6: `dequeue`/`ack`/`nack`.
/// Implementation details of the real queue (persistence, visibility timeouts) are
/// explicitly out of scope; this trait is the duck-typed seam the worker binds to.
#[async_trait]
pub trait JobQueue: Send + Sync {
	async fn dequeue(&self) -> Option<CompanyJob>;
	async fn ack(&self, job: &CompanyJob, result: &JobResult);
	async fn nack(&self, job: &CompanyJob, error: &JobFailure);
}

/// In-memory test double. Ack/nack outcomes are retained for assertions rather than
/// discarded, since real persistence is out of scope.
#[derive(Default)]
pub struct InMemoryJobQueue {
	pending: Mutex<VecDeque<CompanyJob>>,
	completed: Mutex<Vec<(CompanyJob, JobResult)>>,
	failed: Mutex<Vec<(CompanyJob, JobFailure)>>,
}

impl InMemoryJobQueue {
	pub fn new(jobs: impl IntoIterator<Item = CompanyJob>) -> Self {
		Self { pending: Mutex::new(jobs.into_iter().collect()), completed: Mutex::new(Vec::new()), failed: Mutex::new(Vec::new()) }
	}

	pub async fn completed(&self) -> Vec<(CompanyJob, JobResult)> {
		self.completed.lock().await.clone()
	}

	pub async fn failed(&self) -> Vec<(CompanyJob, JobFailure)> {
		self.failed.lock().await.clone()
	}
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
	async fn dequeue(&self) -> Option<CompanyJob> {
		self.pending.lock().await.pop_front()
	}

	async fn ack(&self, job: &CompanyJob, result: &JobResult) {
		self.completed.lock().await.push((job.clone(), result.clone()));
	}

	async fn nack(&self, job: &CompanyJob, error: &JobFailure) {
		self.failed.lock().await.push((job.clone(), error.clone()));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn job(id: &str) -> CompanyJob {
		CompanyJob { id: id.into(), cnpj: None, trade_name: None, legal_name: None, city: None, seed_url: None }
	}

	#[tokio::test]
	async fn dequeues_in_fifo_order() {
		let queue = InMemoryJobQueue::new(vec![job("a"), job("b")]);
		assert_eq!(queue.dequeue().await.unwrap().id, "a");
		assert_eq!(queue.dequeue().await.unwrap().id, "b");
		assert!(queue.dequeue().await.is_none());
	}

	#[tokio::test]
	async fn ack_and_nack_are_retained_for_assertions() {
		let queue = InMemoryJobQueue::new(vec![]);
		let failure = JobFailure::new("scrape_empty", "no content", "scrape");
		queue.nack(&job("a"), &failure).await;
		assert_eq!(queue.failed().await.len(), 1);
		assert_eq!(queue.completed().await.len(), 0);
	}
}
