//! Periodic task runner
//!
//! Owns named interval loops. Each name maps to at most one loop; starting
//! a name again replaces the previous loop. A failing or panicking tick is
//! logged and the loop keeps its schedule.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

const MIN_INTERVAL: Duration = Duration::from_millis(1);
/// Deadlines past this would overflow `Instant` arithmetic
const MAX_INTERVAL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

struct TaskHandle {
    interval: Duration,
    // Dropping the sender ends the loop
    _shutdown_tx: mpsc::Sender<()>,
    _join: JoinHandle<()>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub name: String,
    pub running: bool,
    pub interval_secs: Option<u64>,
}

#[derive(Default)]
pub struct TaskRunner {
    tasks: RwLock<HashMap<String, TaskHandle>>,
    known: RwLock<BTreeSet<String>>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` every `every`, first run one interval from now
    pub async fn start<F, Fut>(&self, name: &str, every: Duration, action: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        // tokio intervals reject a zero period
        let every = every.clamp(MIN_INTERVAL, MAX_INTERVAL);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let action = Arc::new(action);
        let task_name = name.to_string();

        let join = tokio::spawn(async move {
            let mut tick = interval(every);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            tick.tick().await;

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        run_tick(&task_name, action.as_ref()).await;
                    }
                    _ = shutdown_rx.recv() => {
                        debug!(task = %task_name, "Task loop stopped");
                        break;
                    }
                }
            }
        });

        let handle = TaskHandle {
            interval: every,
            _shutdown_tx: shutdown_tx,
            _join: join,
        };

        let replaced = self.tasks.write().await.insert(name.to_string(), handle);
        self.known.write().await.insert(name.to_string());

        if replaced.is_some() {
            info!(task = name, interval_secs = every.as_secs(), "Task restarted");
        } else {
            info!(task = name, interval_secs = every.as_secs(), "Task started");
        }
    }

    /// Stop a task; unknown or already stopped names are ignored
    pub async fn stop(&self, name: &str) {
        if self.tasks.write().await.remove(name).is_some() {
            info!(task = name, "Task stopped");
        }
    }

    pub async fn stop_all(&self) {
        let stopped: Vec<String> = self.tasks.write().await.drain().map(|(name, _)| name).collect();
        if !stopped.is_empty() {
            info!(tasks = ?stopped, "All tasks stopped");
        }
    }

    pub async fn is_running(&self, name: &str) -> bool {
        self.tasks.read().await.contains_key(name)
    }

    /// Every task name ever started, with its current state
    pub async fn status(&self) -> Vec<TaskStatus> {
        let tasks = self.tasks.read().await;
        self.known
            .read()
            .await
            .iter()
            .map(|name| {
                let handle = tasks.get(name);
                TaskStatus {
                    name: name.clone(),
                    running: handle.is_some(),
                    interval_secs: handle.map(|h| h.interval.as_secs()),
                }
            })
            .collect()
    }
}

/// Run one tick on its own task so a panic cannot take the loop down
async fn run_tick<F, Fut>(name: &str, action: &F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<(), String>> + Send + 'static,
{
    debug!(task = name, "Running scheduled task");
    match tokio::spawn(action()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(task = name, error = %e, "Scheduled task failed"),
        Err(e) if e.is_panic() => error!(task = name, "Scheduled task panicked"),
        Err(e) => error!(task = name, error = %e, "Scheduled task aborted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_action(
        counter: Arc<AtomicUsize>,
    ) -> impl Fn() -> std::future::Ready<Result<(), String>> + Send + Sync + 'static {
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_task_ticks_until_stopped() {
        let runner = TaskRunner::new();
        let counter = Arc::new(AtomicUsize::new(0));

        runner
            .start("mandi-prices", Duration::from_millis(20), counter_action(counter.clone()))
            .await;
        tokio::time::sleep(Duration::from_millis(110)).await;
        assert!(counter.load(Ordering::SeqCst) >= 2);

        runner.stop("mandi-prices").await;
        let status = runner.status().await;
        assert_eq!(status.len(), 1);
        assert!(!status[0].running);

        let after_stop = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);

        // Stopping again, or stopping an unknown name, is a no-op
        runner.stop("mandi-prices").await;
        runner.stop("never-started").await;
        assert_eq!(runner.status().await.len(), 1);
    }

    #[tokio::test]
    async fn test_restart_replaces_previous_loop() {
        let runner = TaskRunner::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        runner
            .start("schemes", Duration::from_millis(20), counter_action(first.clone()))
            .await;
        runner
            .start("schemes", Duration::from_millis(20), counter_action(second.clone()))
            .await;
        tokio::time::sleep(Duration::from_millis(110)).await;

        // The replaced loop may not have ticked at all
        assert!(first.load(Ordering::SeqCst) <= 1);
        assert!(second.load(Ordering::SeqCst) >= 2);
        assert_eq!(runner.status().await.len(), 1);
        runner.stop_all().await;
    }

    #[tokio::test]
    async fn test_failures_and_panics_do_not_stop_schedule() {
        let runner = TaskRunner::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        runner
            .start("flaky", Duration::from_millis(20), move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    match n {
                        0 => Err("upstream unavailable".to_string()),
                        1 => panic!("tick exploded"),
                        _ => Ok(()),
                    }
                }
            })
            .await;
        tokio::time::sleep(Duration::from_millis(130)).await;

        assert!(attempts.load(Ordering::SeqCst) >= 3);
        assert!(runner.is_running("flaky").await);
        runner.stop_all().await;
        assert!(!runner.is_running("flaky").await);
    }

    #[tokio::test]
    async fn test_status_lists_every_known_task() {
        let runner = TaskRunner::new();
        runner
            .start("mandi-prices", Duration::from_secs(3600), || async { Ok(()) })
            .await;
        runner
            .start("schemes", Duration::from_secs(86400), || async { Ok(()) })
            .await;
        runner.stop("schemes").await;

        let status = runner.status().await;
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].name, "mandi-prices");
        assert!(status[0].running);
        assert_eq!(status[0].interval_secs, Some(3600));
        assert_eq!(status[1].name, "schemes");
        assert!(!status[1].running);
        assert_eq!(status[1].interval_secs, None);
    }

    #[tokio::test]
    async fn test_interval_clamped_to_range() {
        let runner = TaskRunner::new();
        runner.start("forever", Duration::MAX, || async { Ok(()) }).await;

        let status = runner.status().await;
        assert!(status[0].running);
        assert_eq!(status[0].interval_secs, Some(MAX_INTERVAL.as_secs()));
        runner.stop_all().await;
    }
}
