use std::sync::Arc;
use std::time::Duration;

use rustic_viewer_core::TabState;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, trace};

use crate::persistence::SessionPersistence;

enum Command {
    Schedule(Arc<TabState>),
    Flush(oneshot::Sender<()>),
    Shutdown(Option<Arc<TabState>>, oneshot::Sender<()>),
}

/// Debounced session writer.
/// 延遲合併的工作階段寫入器。
///
/// Every scheduled state restarts the quiet period; only the latest state is written
/// once no new state arrived for the configured delay. Dropping the scheduler closes the
/// channel and the worker writes whatever is still pending. Must be created inside a
/// Tokio runtime.
#[derive(Debug)]
pub struct SaveScheduler {
    tx: mpsc::UnboundedSender<Command>,
    worker: Option<JoinHandle<()>>,
    delay: Duration,
}

impl SaveScheduler {
    pub fn spawn(persistence: SessionPersistence, delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run(persistence, delay, rx));
        Self {
            tx,
            worker: Some(worker),
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Queues `state` for writing after the quiet period.
    pub fn schedule(&self, state: Arc<TabState>) {
        if self.tx.send(Command::Schedule(state)).is_err() {
            debug!("save scheduler already stopped");
        }
    }

    /// Writes any pending state immediately.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Writes `final_state` (or whatever is pending) and stops the worker.
    /// 強制寫入最終狀態並停止背景工作。
    pub async fn shutdown(&mut self, final_state: Option<Arc<TabState>>) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Shutdown(final_state, ack)).is_ok() {
            let _ = done.await;
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

async fn run(
    persistence: SessionPersistence,
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    let mut pending: Option<Arc<TabState>> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        let wake = deadline.unwrap_or_else(|| Instant::now() + delay);
        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Schedule(state)) => {
                    trace!("session write rescheduled");
                    pending = Some(state);
                    deadline = Some(Instant::now() + delay);
                }
                Some(Command::Flush(ack)) => {
                    if let Some(state) = pending.take() {
                        write(&persistence, state).await;
                    }
                    deadline = None;
                    let _ = ack.send(());
                }
                Some(Command::Shutdown(final_state, ack)) => {
                    if let Some(state) = final_state.or_else(|| pending.take()) {
                        write(&persistence, state).await;
                    }
                    debug!("session writer stopped");
                    let _ = ack.send(());
                    break;
                }
                None => {
                    if let Some(state) = pending.take() {
                        write(&persistence, state).await;
                    }
                    break;
                }
            },
            _ = sleep_until(wake), if deadline.is_some() => {
                if let Some(state) = pending.take() {
                    write(&persistence, state).await;
                }
                deadline = None;
            }
        }
    }
}

async fn write(persistence: &SessionPersistence, state: Arc<TabState>) {
    let persistence = persistence.clone();
    let task = tokio::task::spawn_blocking(move || persistence.save_session(&state));
    if let Err(err) = task.await {
        error!(error = %err, "session write task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use rustic_viewer_core::InMemoryLister;

    const KEY: &str = "session";

    fn scheduler(storage: Arc<MemoryStorage>) -> SaveScheduler {
        let persistence = SessionPersistence::new(storage, Arc::new(InMemoryLister::new()), KEY);
        SaveScheduler::spawn(persistence, Duration::from_millis(300))
    }

    fn state_with_tabs(count: usize) -> Arc<TabState> {
        let mut state = TabState::default();
        for _ in 0..count {
            state.add_empty_tab();
        }
        Arc::new(state)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_changes_collapses_into_one_write() {
        let storage = Arc::new(MemoryStorage::new());
        let writer = scheduler(storage.clone());

        for count in 1..=5 {
            writer.schedule(state_with_tabs(count));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(storage.write_count(), 0);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(storage.write_count(), 1);
        let stored = storage.get(KEY).unwrap();
        let session: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(session["tabOrder"].as_array().map(Vec::len), Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_writes_pending_state_immediately() {
        let storage = Arc::new(MemoryStorage::new());
        let writer = scheduler(storage.clone());

        writer.schedule(state_with_tabs(2));
        writer.flush().await;
        assert_eq!(storage.write_count(), 1);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(storage.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_writer_keeps_pending_state() {
        let storage = Arc::new(MemoryStorage::new());
        let writer = scheduler(storage.clone());

        writer.schedule(state_with_tabs(2));
        drop(writer);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(storage.write_count(), 1);
        let stored = storage.get(KEY).unwrap();
        let session: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(session["tabOrder"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_forces_final_write() {
        let storage = Arc::new(MemoryStorage::new());
        let mut writer = scheduler(storage.clone());

        writer.schedule(state_with_tabs(1));
        writer.shutdown(Some(state_with_tabs(3))).await;
        assert_eq!(storage.write_count(), 1);
        let stored = storage.get(KEY).unwrap();
        let session: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(session["tabOrder"].as_array().map(Vec::len), Some(3));

        writer.schedule(state_with_tabs(4));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(storage.write_count(), 1);
    }
}
