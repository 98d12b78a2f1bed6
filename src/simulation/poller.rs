use crate::api::{SimulationApi, EVENT_FETCH_LIMIT};
use crate::model::{SimulationEvent, StatusSnapshot};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollKind {
    Status,
    Events,
}

/// Result of one poll, tagged with the generation of the polling session that produced it.
#[derive(Debug, Clone)]
pub struct SimUpdate {
    pub generation: u64,
    pub payload: UpdatePayload,
}

#[derive(Debug, Clone)]
pub enum UpdatePayload {
    Status(StatusSnapshot),
    Events(Vec<SimulationEvent>),
}

/// Recurring poll tasks, at most one per kind.
///
/// Cancellation aborts the task, which also drops any request it has in flight.
/// Dropping `Pollers` cancels everything it owns.
#[derive(Default)]
pub struct Pollers {
    tasks: HashMap<PollKind, JoinHandle<()>>,
}

impl Pollers {
    /// Replace the task for `kind`; the previous one is aborted first.
    pub fn spawn<F>(&mut self, kind: PollKind, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel(kind);
        self.tasks.insert(kind, tokio::spawn(task));
    }

    pub fn cancel(&mut self, kind: PollKind) {
        if let Some(handle) = self.tasks.remove(&kind) {
            handle.abort();
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }

    pub fn is_active(&self, kind: PollKind) -> bool {
        self.tasks.contains_key(&kind)
    }

    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }
}

impl Drop for Pollers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Everything a poll loop needs, owned so the loop can run as a detached task.
pub(crate) struct PollTarget<A> {
    pub api: Arc<A>,
    pub instance_id: String,
    pub generation: u64,
    pub tx: UnboundedSender<SimUpdate>,
}

impl<A> Clone for PollTarget<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            instance_id: self.instance_id.clone(),
            generation: self.generation,
            tx: self.tx.clone(),
        }
    }
}

impl<A: SimulationApi> PollTarget<A> {
    fn emit(&self, payload: UpdatePayload) -> bool {
        self.tx
            .send(SimUpdate {
                generation: self.generation,
                payload,
            })
            .is_ok()
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval(period);
    // A slow response delays only its own loop; ticks are not bunched up afterwards.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

pub(crate) async fn status_loop<A: SimulationApi>(target: PollTarget<A>, period: Duration) {
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        match target.api.status(&target.instance_id).await {
            Ok(snapshot) => {
                if !target.emit(UpdatePayload::Status(snapshot)) {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(
                    instance = %target.instance_id,
                    code = ?e.status_code(),
                    error = %e,
                    "status poll failed"
                );
            }
        }
    }
}

pub(crate) async fn events_loop<A: SimulationApi>(target: PollTarget<A>, period: Duration) {
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        match target.api.events(&target.instance_id, EVENT_FETCH_LIMIT).await {
            Ok(events) => {
                if !target.emit(UpdatePayload::Events(events)) {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(
                    instance = %target.instance_id,
                    code = ?e.status_code(),
                    error = %e,
                    "events poll failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn spawning_same_kind_replaces_previous_task() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut pollers = Pollers::default();

        for _ in 0..2 {
            let runs = runs.clone();
            pollers.spawn(PollKind::Status, async move {
                loop {
                    runs.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
            });
        }
        assert_eq!(pollers.active_count(), 1);

        tokio::time::sleep(Duration::from_millis(2_250)).await;
        // One loop alive: an immediate run plus one per 500ms elapsed.
        assert_eq!(runs.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_safe_when_nothing_runs() {
        let mut pollers = Pollers::default();
        pollers.cancel(PollKind::Events);
        pollers.cancel_all();
        assert_eq!(pollers.active_count(), 0);
        assert!(!pollers.is_active(PollKind::Status));
    }
}
