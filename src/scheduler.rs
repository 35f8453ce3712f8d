//! Single-slot deferred stimulus scheduler.
//!
//! At most one stimulus task is tracked. Every accepted trigger cancels the
//! tracked task if it is still waiting out its delay, then installs a new one.
//! Each task runs on its own worker thread:
//!
//! ```text
//! Waiting --deadline--> Running --emit done--> Finished
//!    |
//!    +--cancel--> Cancelled
//! ```
//!
//! Leaving `Waiting` happens under the task lock, so a cancel that wins the
//! lock always prevents emission and a cancel that loses it is a no-op. The
//! gate is activated in the same critical section, so a task is never seen as
//! neither waiting nor inhibiting.

use crate::{
    gate::{GateHold, InhibitionGate},
    stimulus::{StimulusEmitter, StimulusParams},
    Result,
};
use log::{debug, error, info};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Waiting,
    Cancelled,
    Running,
    Finished,
}

/// One deferred stimulus
#[derive(Debug)]
struct StimulusTask {
    id: u64,
    state: Mutex<TaskState>,
    wake: Condvar,
}

impl StimulusTask {
    fn new(id: u64) -> Self {
        Self {
            id,
            state: Mutex::new(TaskState::Waiting),
            wake: Condvar::new(),
        }
    }

    /// Cancel if still waiting. Returns whether the task was cancelled.
    fn cancel(&self) -> bool {
        let mut state = self.state.lock();
        if *state == TaskState::Waiting {
            *state = TaskState::Cancelled;
            self.wake.notify_all();
            true
        } else {
            false
        }
    }

    /// Wait for the deadline. If the task moved to `Running`, returns the
    /// hold on `gate` taken before the task lock was released.
    fn wait_until_due<'g>(&self, deadline: Instant, gate: &'g InhibitionGate) -> Option<GateHold<'g>> {
        let mut state = self.state.lock();
        while *state == TaskState::Waiting {
            if self.wake.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        if *state == TaskState::Waiting {
            *state = TaskState::Running;
            Some(gate.hold())
        } else {
            None
        }
    }

    fn finish(&self) {
        *self.state.lock() = TaskState::Finished;
    }

    fn is_waiting(&self) -> bool {
        *self.state.lock() == TaskState::Waiting
    }
}

struct PendingStimulus {
    task: Arc<StimulusTask>,
    worker: JoinHandle<()>,
}

#[derive(Default)]
struct Slot {
    pending: Option<PendingStimulus>,
    retired: Vec<JoinHandle<()>>,
}

/// Counters updated by the scheduler and its workers
#[derive(Debug, Default)]
pub struct SchedulerStats {
    scheduled: AtomicU64,
    superseded: AtomicU64,
    emitted: AtomicU64,
    failed: AtomicU64,
}

impl SchedulerStats {
    /// Take a consistent-enough copy of the counters
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            scheduled: self.scheduled.load(Ordering::SeqCst),
            superseded: self.superseded.load(Ordering::SeqCst),
            emitted: self.emitted.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time copy of [`SchedulerStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Tasks created by `trigger`
    pub scheduled: u64,
    /// Tasks cancelled before they fired
    pub superseded: u64,
    /// Emissions that completed successfully
    pub emitted: u64,
    /// Emissions that returned an error
    pub failed: u64,
}

/// Single-slot, last-writer-wins stimulus scheduler
pub struct StimulusScheduler {
    emitter: Arc<dyn StimulusEmitter>,
    gate: InhibitionGate,
    slot: Mutex<Slot>,
    stats: Arc<SchedulerStats>,
    next_id: AtomicU64,
}

impl StimulusScheduler {
    /// Create a scheduler that emits through `emitter` and holds `gate` while emitting
    #[must_use]
    pub fn new(emitter: Arc<dyn StimulusEmitter>, gate: InhibitionGate) -> Self {
        Self {
            emitter,
            gate,
            slot: Mutex::new(Slot::default()),
            stats: Arc::new(SchedulerStats::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Supersede any waiting task and schedule a stimulus after `delay`.
    ///
    /// Returns the id of the new task. The call never blocks on emission.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned.
    pub fn trigger(&self, delay: Duration, params: StimulusParams) -> Result<u64> {
        let deadline = Instant::now() + delay;
        let mut slot = self.slot.lock();

        if let Some(previous) = slot.pending.take() {
            if previous.task.cancel() {
                self.stats.superseded.fetch_add(1, Ordering::SeqCst);
                debug!("Stimulus task {} superseded before firing", previous.task.id);
            }
            slot.retired.push(previous.worker);
        }
        slot.retired.retain(|worker| !worker.is_finished());

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let task = Arc::new(StimulusTask::new(id));
        let worker = {
            let task = Arc::clone(&task);
            let emitter = Arc::clone(&self.emitter);
            let gate = self.gate.clone();
            let stats = Arc::clone(&self.stats);
            thread::Builder::new()
                .name(format!("stimulus-{id}"))
                .spawn(move || run_task(&task, deadline, &params, emitter.as_ref(), &gate, &stats))?
        };

        self.stats.scheduled.fetch_add(1, Ordering::SeqCst);
        slot.pending = Some(PendingStimulus { task, worker });
        debug!("Scheduled stimulus task {} in {:?}", id, delay);

        Ok(id)
    }

    /// Cancel the tracked task if it has not started. Returns whether it was cancelled.
    pub fn cancel_pending(&self) -> bool {
        let slot = self.slot.lock();
        match &slot.pending {
            Some(pending) if pending.task.cancel() => {
                self.stats.superseded.fetch_add(1, Ordering::SeqCst);
                debug!("Stimulus task {} cancelled", pending.task.id);
                true
            }
            _ => false,
        }
    }

    /// Whether a task is still waiting out its delay
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.slot
            .lock()
            .pending
            .as_ref()
            .is_some_and(|pending| pending.task.is_waiting())
    }

    /// Block until every worker has exited, including superseded ones still emitting
    pub fn wait_idle(&self) {
        let workers: Vec<JoinHandle<()>> = {
            let mut slot = self.slot.lock();
            let mut workers = std::mem::take(&mut slot.retired);
            if let Some(pending) = slot.pending.take() {
                workers.push(pending.worker);
            }
            workers
        };

        for worker in workers {
            if worker.join().is_err() {
                error!("Stimulus worker panicked");
            }
        }
    }

    /// Counters for scheduled, superseded, emitted and failed stimuli
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// The gate this scheduler holds while emitting
    #[must_use]
    pub const fn gate(&self) -> &InhibitionGate {
        &self.gate
    }
}

fn run_task(
    task: &StimulusTask,
    deadline: Instant,
    params: &StimulusParams,
    emitter: &dyn StimulusEmitter,
    gate: &InhibitionGate,
    stats: &SchedulerStats,
) {
    let Some(hold) = task.wait_until_due(deadline, gate) else {
        debug!("Stimulus task {} exited without firing", task.id);
        return;
    };

    {
        let _hold = hold;
        info!(
            "Stimulus {} firing: {:.3}s {}-{} Hz (left: {}, right: {})",
            task.id, params.duration_secs, params.freq_min_hz, params.freq_max_hz, params.left_enabled, params.right_enabled
        );
        match emitter.emit(params) {
            Ok(()) => {
                stats.emitted.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::SeqCst);
                error!("Stimulus {} failed on {}: {}", task.id, emitter.name(), e);
            }
        }
    }

    task.finish();
}
