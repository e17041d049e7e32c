//! Persistence worker: debounced saves and delta-batch flushing.
//!
//! Every mutation pushes a [`StateUpdate`] to this worker. The worker keeps
//! only the latest snapshot (latest generation wins), unions the delta
//! batches, and (re)starts one idle timer per update, never stacking
//! timers. When the timer fires with no further dirtying, exactly one save
//! happens: bursts of UI-driven mutation coalesce into one write. Teardown
//! flushes a pending update immediately so the final burst is never lost.

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant, sleep};
use tracing::{debug, error, info};

use loadout_core::{DeltaBatch, InventoryConfig, InventorySnapshot};

use crate::events::{Event, EventBus, InventoryEvent, PersistenceEvent};
use crate::repository::{RepositoryError, SnapshotRepository};

/// Result type for persistence operations
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Errors that can occur during persistence operations
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("persistence worker is not running")]
    WorkerUnavailable,
}

/// Configuration for the persistence worker
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Idle interval after the last update before a save fires.
    pub debounce: Duration,
}

impl PersistenceConfig {
    pub fn new(debounce: Duration) -> Self {
        Self { debounce }
    }

    pub fn from_inventory(config: &InventoryConfig) -> Self {
        Self::new(Duration::from_millis(config.save_debounce_ms))
    }
}

/// One dirtying mutation's outcome, shipped to the worker.
#[derive(Debug)]
pub struct StateUpdate {
    pub snapshot: InventorySnapshot,
    pub deltas: DeltaBatch,
    /// Monotonic per-service counter; a stale generation never overwrites a
    /// newer pending snapshot.
    pub generation: u64,
}

/// Commands that can be sent to the persistence worker
pub enum Command {
    /// Save the pending state immediately, skipping the debounce window.
    /// Replies with whether a save actually happened.
    FlushNow { reply: oneshot::Sender<Result<bool>> },

    /// Shutdown the worker gracefully (flushes pending state).
    Shutdown,
}

/// Background worker that owns the snapshot repository.
pub struct PersistenceWorker {
    config: PersistenceConfig,
    repository: Box<dyn SnapshotRepository>,
    bus: EventBus,

    update_rx: mpsc::UnboundedReceiver<StateUpdate>,
    command_rx: mpsc::Receiver<Command>,

    pending: Option<InventorySnapshot>,
    pending_deltas: DeltaBatch,
    pending_generation: u64,
    saved_generation: u64,
}

impl PersistenceWorker {
    pub fn new(
        config: PersistenceConfig,
        repository: Box<dyn SnapshotRepository>,
        bus: EventBus,
        update_rx: mpsc::UnboundedReceiver<StateUpdate>,
        command_rx: mpsc::Receiver<Command>,
    ) -> Self {
        Self {
            config,
            repository,
            bus,
            update_rx,
            command_rx,
            pending: None,
            pending_deltas: DeltaBatch::new(),
            pending_generation: 0,
            saved_generation: 0,
        }
    }

    /// Main worker loop
    pub async fn run(mut self) {
        info!(
            "PersistenceWorker started: debounce={:?}",
            self.config.debounce
        );

        // One timer, re-armed on every update; a disarmed timer never fires.
        let timer = sleep(Duration::from_secs(0));
        tokio::pin!(timer);
        let mut armed = false;

        loop {
            tokio::select! {
                update = self.update_rx.recv() => {
                    match update {
                        Some(update) => {
                            self.absorb(update);
                            timer.as_mut().reset(Instant::now() + self.config.debounce);
                            armed = true;
                        }
                        None => break, // service dropped; final flush below
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(Command::FlushNow { reply }) => {
                            // Updates sent before the command must land first.
                            self.drain_updates();
                            armed = false;
                            let _ = reply.send(self.flush());
                        }
                        Some(Command::Shutdown) | None => break,
                    }
                }

                () = &mut timer, if armed => {
                    armed = false;
                    if let Err(e) = self.flush() {
                        error!("Debounced save failed: {}", e);
                    }
                }
            }
        }

        // Teardown: flush the final burst instead of losing it.
        self.drain_updates();
        if let Err(e) = self.flush() {
            error!("Final flush failed: {}", e);
        }

        info!("PersistenceWorker stopped");
    }

    /// Absorbs every update already queued, without waiting.
    fn drain_updates(&mut self) {
        while let Ok(update) = self.update_rx.try_recv() {
            self.absorb(update);
        }
    }

    /// Folds an update into the pending state: latest snapshot wins, delta
    /// batches union.
    fn absorb(&mut self, update: StateUpdate) {
        if update.generation >= self.pending_generation {
            self.pending_generation = update.generation;
            self.pending = Some(update.snapshot);
        } else {
            debug!(
                "Discarding stale snapshot (generation {} < {})",
                update.generation, self.pending_generation
            );
        }
        self.pending_deltas.merge(update.deltas);
    }

    /// Writes the pending snapshot, if any, and publishes the delta batch.
    ///
    /// On a failed write the pending state is retained so the next timer
    /// firing (or teardown) retries instead of losing the burst.
    fn flush(&mut self) -> Result<bool> {
        let Some(snapshot) = self.pending.as_ref() else {
            return Ok(false);
        };
        if self.pending_generation <= self.saved_generation {
            self.pending = None;
            return Ok(false);
        }

        let owner = snapshot.owner;
        let digest = self.repository.save(snapshot)?;

        self.pending = None;
        self.saved_generation = self.pending_generation;
        let deltas = self.pending_deltas.take();

        debug!(
            "Saved snapshot for owner {} (generation {}, {} delta record(s))",
            owner,
            self.saved_generation,
            deltas.len()
        );

        self.bus
            .publish(Event::Persistence(PersistenceEvent::SaveCompleted {
                owner,
                digest,
                deltas: deltas.len(),
            }));
        if !deltas.is_empty() {
            self.bus.publish(Event::Inventory(InventoryEvent::Delta {
                owner,
                batch: deltas,
            }));
        }

        Ok(true)
    }
}
