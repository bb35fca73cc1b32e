// Adapted from the teacher's connection-draining primitive (crates/core/src/drain.rs),
// simplified for a job-processing worker loop rather than an inbound connection server:
// there are no accepted connections to stop accepting, only an in-flight job to let finish.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

/// One side is held by the main loop while a job is being processed ([`JobGuard`]);
/// the other is awaited by the shutdown sequence ([`DrainSignal`]).
pub fn new() -> (DrainSignal, JobHandle) {
	let (tx, rx) = watch::channel(false);
	(DrainSignal { tx }, JobHandle { rx })
}

#[derive(Clone)]
pub struct JobHandle {
	rx: watch::Receiver<bool>,
}

impl JobHandle {
	/// True once a drain has been requested; the worker loop should stop dequeuing
	/// new jobs but is free to finish whatever it currently holds a [`JobGuard`] for.
	pub fn draining(&self) -> bool {
		*self.rx.borrow()
	}
}

pub struct DrainSignal {
	tx: watch::Sender<bool>,
}

impl DrainSignal {
	/// Marks the worker as draining and waits up to `deadline` for the in-flight job
	/// (tracked externally via the job's own completion, not this channel) by polling
	/// `still_busy`. Returns once `still_busy` reports false or the deadline elapses.
	pub async fn start_drain_and_wait<F>(&self, deadline: Duration, mut still_busy: F)
	where
		F: FnMut() -> bool,
	{
		let _ = self.tx.send(true);
		info!(?deadline, "drain started, waiting for in-flight job to finish");
		let wait = async {
			while still_busy() {
				tokio::time::sleep(Duration::from_millis(100)).await;
			}
		};
		if tokio::time::timeout(deadline, wait).await.is_err() {
			warn!("drain deadline expired with a job still in flight, shutting down anyway");
		}
	}
}
