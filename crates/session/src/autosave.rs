//! Debounced background persistence for a draft record.
//!
//! The coordinator owns the draft: the form reports field changes as
//! patches, a worker task applies them and schedules saves. A save fires
//! after the configured quiet period, restarting on every change, and at
//! most one save is ever queued behind an in-flight one, so a burst of
//! edits collapses into a single write carrying the merged draft.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use gearbook_core::config::AutosaveConfig;
use gearbook_core::domain::customer::CustomerRecord;
use gearbook_core::patch::RecordPatch;
use gearbook_core::validation::viability::{minimum_viable, SessionMode};
use gearbook_db::repositories::{CustomerStore, RepositoryError};

use crate::errors::SessionError;

/// Save-state snapshot published to status indicators.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AutosaveStatus {
    /// Unsaved changes exist.
    pub dirty: bool,
    /// Dirty, but the draft was below the viability gate when the timer
    /// last fired. Clears once a save actually starts.
    pub withheld: bool,
    pub save_count: u64,
    pub last_error: Option<String>,
}

enum Command {
    Change(RecordPatch),
    Flush(oneshot::Sender<Result<(), SessionError>>),
}

pub struct AutosaveCoordinator {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<AutosaveStatus>,
    record: watch::Receiver<CustomerRecord>,
    worker: JoinHandle<()>,
}

impl AutosaveCoordinator {
    pub fn spawn(
        record: CustomerRecord,
        mode: SessionMode,
        config: AutosaveConfig,
        store: Arc<dyn CustomerStore>,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(AutosaveStatus::default());
        let (record_tx, record_rx) = watch::channel(record.clone());

        let worker = Worker {
            record,
            mode,
            debounce: Duration::from_millis(config.debounce_ms),
            flush_on_exit: config.flush_on_exit,
            store,
            status: status_tx,
            published: record_tx,
            dirty: false,
            withheld: false,
            generation: 0,
            save_count: 0,
            last_error: None,
        };
        let worker = tokio::spawn(worker.run(command_rx));

        Self { commands, status, record: record_rx, worker }
    }

    /// Records a field change. The draft updates immediately; persistence
    /// happens after the debounce window closes.
    pub fn note_change(&self, patch: RecordPatch) -> Result<(), SessionError> {
        self.commands.send(Command::Change(patch)).map_err(|_| SessionError::Closed)
    }

    /// Forces any dirty, viable draft to disk right now, waiting out an
    /// in-flight save first.
    pub async fn flush(&self) -> Result<(), SessionError> {
        let (ack, done) = oneshot::channel();
        self.commands.send(Command::Flush(ack)).map_err(|_| SessionError::Closed)?;
        done.await.map_err(|_| SessionError::Closed)?
    }

    /// Tears the session down, flushing dirty work first.
    pub async fn finish(self) -> Result<(), SessionError> {
        let Self { commands, worker, .. } = self;

        let (ack, done) = oneshot::channel();
        if commands.send(Command::Flush(ack)).is_err() {
            return Err(SessionError::Closed);
        }
        let result = done.await.map_err(|_| SessionError::Closed)?;

        drop(commands);
        let _ = worker.await;
        result
    }

    pub fn status(&self) -> AutosaveStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<AutosaveStatus> {
        self.status.clone()
    }

    /// Current draft, including unsaved changes.
    pub fn record(&self) -> CustomerRecord {
        self.record.borrow().clone()
    }

    pub fn subscribe_record(&self) -> watch::Receiver<CustomerRecord> {
        self.record.clone()
    }
}

struct InFlight {
    generation: u64,
    result: oneshot::Receiver<Result<CustomerRecord, RepositoryError>>,
}

struct Worker {
    record: CustomerRecord,
    mode: SessionMode,
    debounce: Duration,
    flush_on_exit: bool,
    store: Arc<dyn CustomerStore>,
    status: watch::Sender<AutosaveStatus>,
    published: watch::Sender<CustomerRecord>,
    dirty: bool,
    withheld: bool,
    /// Bumped on every applied change; a save that completes against an
    /// older generation leaves the draft dirty.
    generation: u64,
    save_count: u64,
    last_error: Option<String>,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut deadline: Option<Instant> = None;
        let mut in_flight: Option<InFlight> = None;
        let mut pending = false;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Change(patch)) => {
                        if self.apply_change(patch) {
                            deadline = Some(Instant::now() + self.debounce);
                        }
                    }
                    Some(Command::Flush(ack)) => {
                        if let Some(save) = in_flight.take() {
                            let outcome = await_save(save.result).await;
                            self.complete_save(save.generation, outcome);
                        }
                        pending = false;
                        deadline = None;
                        let _ = ack.send(self.final_save().await);
                    }
                    // The session handle is gone; best-effort flush and exit.
                    None => {
                        if let Some(save) = in_flight.take() {
                            let outcome = await_save(save.result).await;
                            self.complete_save(save.generation, outcome);
                        }
                        if self.flush_on_exit {
                            let _ = self.final_save().await;
                        }
                        return;
                    }
                },
                _ = async {
                    match deadline {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                } => {
                    deadline = None;
                    if in_flight.is_some() {
                        // Coalesce: one follow-up save, no matter how many
                        // windows close while this one is out.
                        pending = true;
                    } else {
                        in_flight = self.begin_save();
                    }
                }
                outcome = async {
                    match in_flight.as_mut() {
                        Some(save) => await_save(&mut save.result).await,
                        None => std::future::pending().await,
                    }
                } => {
                    let generation = in_flight.take().map(|save| save.generation).unwrap_or(self.generation);
                    self.complete_save(generation, outcome);
                    if pending {
                        pending = false;
                        in_flight = self.begin_save();
                    }
                }
            }
        }
    }

    /// Applies a patch to the draft. Returns whether the debounce timer
    /// should (re)start.
    fn apply_change(&mut self, patch: RecordPatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        match patch.apply(&mut self.record) {
            Ok(_) => {
                self.generation += 1;
                self.dirty = true;
                self.published.send_replace(self.record.clone());
                self.publish_status();
                true
            }
            Err(error) => {
                warn!(%error, "field change rejected, draft left untouched");
                self.last_error = Some(error.to_string());
                self.publish_status();
                false
            }
        }
    }

    /// Starts a background save of the current draft, unless the draft is
    /// below the viability gate, in which case it stays dirty and waits
    /// for the next change.
    fn begin_save(&mut self) -> Option<InFlight> {
        if !minimum_viable(&self.record, self.mode) {
            debug!("autosave withheld, draft is not minimally viable yet");
            self.withheld = true;
            self.publish_status();
            return None;
        }
        self.withheld = false;

        let snapshot = self.record.clone();
        let generation = self.generation;
        let store = Arc::clone(&self.store);
        let (report, result) = oneshot::channel();
        tokio::spawn(async move {
            let _ = report.send(store.upsert(snapshot).await);
        });
        Some(InFlight { generation, result })
    }

    fn complete_save(&mut self, generation: u64, outcome: Result<CustomerRecord, RepositoryError>) {
        match outcome {
            Ok(stored) => {
                // Backend-assigned fields flow back into the draft; a create
                // session holds its id from the first successful save on.
                self.record.id = stored.id;
                self.record.updated_at = stored.updated_at;
                self.save_count += 1;
                self.last_error = None;
                if self.generation == generation {
                    self.dirty = false;
                }
                self.published.send_replace(self.record.clone());
            }
            Err(error) => {
                warn!(%error, "autosave failed, draft stays dirty until the next change");
                self.last_error = Some(error.to_string());
            }
        }
        self.publish_status();
    }

    /// Synchronous save used by flush and teardown. A draft below the
    /// viability gate is silently left behind.
    async fn final_save(&mut self) -> Result<(), SessionError> {
        if !self.dirty || !minimum_viable(&self.record, self.mode) {
            return Ok(());
        }
        let generation = self.generation;
        match self.store.upsert(self.record.clone()).await {
            Ok(stored) => {
                self.complete_save(generation, Ok(stored));
                Ok(())
            }
            Err(error) => {
                let message = error.to_string();
                self.complete_save(generation, Err(error));
                Err(SessionError::Persistence(message))
            }
        }
    }

    fn publish_status(&self) {
        self.status.send_replace(AutosaveStatus {
            dirty: self.dirty,
            withheld: self.withheld,
            save_count: self.save_count,
            last_error: self.last_error.clone(),
        });
    }
}

async fn await_save(
    result: impl std::future::Future<Output = Result<Result<CustomerRecord, RepositoryError>, oneshot::error::RecvError>>,
) -> Result<CustomerRecord, RepositoryError> {
    result
        .await
        .unwrap_or_else(|_| Err(RepositoryError::Unavailable("save task dropped".to_string())))
}
