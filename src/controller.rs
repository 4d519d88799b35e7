//! Time-boxed search over packing heuristics.
//!
//! An [`OptimizationRun`] owns everything one optimization needs: a validated copy
//! of the sheet and pieces, the heuristic schedule, and the flags shared with its
//! [`RunHandle`]. Passes run one after another on a single thread. Progress is
//! reported and cancellation is observed between passes; the engine additionally
//! checks the deadline and the cancel flag between unit placements so a long pass
//! can be abandoned.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::engine::{Interrupt, PackingEngine, PassOutcome, Unplaceable, UnplaceableReason};
use crate::error::{OptimizeError, ValidationError};
use crate::heuristic::{Heuristic, PlacementPolicy};
use crate::inventory::PieceInventory;
use crate::sheet::SheetModel;
use crate::stats::{self, SheetStats};
use crate::types::{Piece, PlacedPiece, Sheet};
use crate::verify;

pub const DEFAULT_TIME_LIMIT_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RunState {
    Idle = 0,
    Running = 1,
    Completed = 2,
    Cancelled = 3,
    Failed = 4,
}

impl RunState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => RunState::Idle,
            1 => RunState::Running,
            2 => RunState::Completed,
            3 => RunState::Cancelled,
            _ => RunState::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Cancelled | RunState::Failed
        )
    }
}

/// Terminal state of a run that produced a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub status: RunStatus,
    pub passes_completed: u32,
    pub planned_passes: u32,
    pub elapsed_ms: u64,
    /// The layout comes from a pass the deadline cut short; see the `TimeLimit`
    /// entries in `unplaceable`.
    pub time_limited: bool,
    /// Name of the policy that produced the layout.
    pub heuristic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub placed_pieces: Vec<PlacedPiece>,
    pub unplaceable: Vec<Unplaceable>,
    pub stats: Vec<SheetStats>,
    pub meta: RunMeta,
}

impl OptimizationResult {
    pub fn sheet_count(&self) -> usize {
        stats::sheet_count(&self.placed_pieces)
    }

    pub fn all_placed(&self) -> bool {
        self.unplaceable.is_empty()
    }

    pub fn unplaceable_for(&self, reason: UnplaceableReason) -> usize {
        self.unplaceable.iter().filter(|u| u.reason == reason).count()
    }
}

pub type RunOutcome = Result<OptimizationResult, OptimizeError>;

/// A placement policy that can be handed to a worker thread.
pub type SharedPolicy = Arc<dyn PlacementPolicy + Send + Sync>;

#[derive(Clone)]
pub struct OptimizeOptions {
    pub time_limit: Duration,
    /// Upper bound on passes; `None` runs the whole schedule.
    pub max_passes: Option<u32>,
    /// One pass per policy, in order.
    pub schedule: Vec<SharedPolicy>,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_millis(DEFAULT_TIME_LIMIT_MS),
            max_passes: None,
            schedule: Heuristic::schedule()
                .into_iter()
                .map(|h| Arc::new(h) as SharedPolicy)
                .collect(),
        }
    }
}

impl fmt::Debug for OptimizeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.schedule.iter().map(|p| p.name()).collect();
        f.debug_struct("OptimizeOptions")
            .field("time_limit", &self.time_limit)
            .field("max_passes", &self.max_passes)
            .field("schedule", &names)
            .finish()
    }
}

impl OptimizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit = Duration::from_millis(ms);
        self
    }

    pub fn with_max_passes(mut self, passes: u32) -> Self {
        self.max_passes = Some(passes.max(1));
        self
    }

    /// Replaces the schedule. An empty schedule falls back to the default
    /// heuristic alone.
    pub fn with_schedule(mut self, schedule: Vec<SharedPolicy>) -> Self {
        self.schedule = if schedule.is_empty() {
            vec![Arc::new(Heuristic::default()) as SharedPolicy]
        } else {
            schedule
        };
        self
    }

    /// Runs a single policy instead of the heuristic schedule.
    pub fn with_policy<P>(self, policy: P) -> Self
    where
        P: PlacementPolicy + Send + Sync + 'static,
    {
        self.with_schedule(vec![Arc::new(policy) as SharedPolicy])
    }

    pub fn planned_passes(&self) -> u32 {
        let len = u32::try_from(self.schedule.len()).unwrap_or(u32::MAX);
        self.max_passes.map_or(len, |max| len.min(max))
    }
}

#[derive(Debug)]
struct RunShared {
    cancelled: AtomicBool,
    state: AtomicU8,
    iteration: AtomicU32,
}

impl RunShared {
    fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            state: AtomicU8::new(RunState::Idle as u8),
            iteration: AtomicU32::new(0),
        }
    }

    fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: RunState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// One optimization invocation. Created per call; never shared between runs.
#[derive(Debug)]
pub struct OptimizationRun {
    sheet: SheetModel,
    inventory: PieceInventory,
    options: OptimizeOptions,
    shared: Arc<RunShared>,
}

impl OptimizationRun {
    /// Validates and copies the input. Fails before any work starts.
    pub fn new(
        sheet: &Sheet,
        pieces: &[Piece],
        options: OptimizeOptions,
    ) -> Result<Self, ValidationError> {
        let sheet = SheetModel::new(sheet.clone())?;
        let inventory = PieceInventory::new(pieces)?;
        let mut options = if options.schedule.is_empty() {
            options.with_schedule(Vec::new())
        } else {
            options
        };
        options.max_passes = options.max_passes.map(|n| n.max(1));
        Ok(Self {
            sheet,
            inventory,
            options,
            shared: Arc::new(RunShared::new()),
        })
    }

    pub fn state(&self) -> RunState {
        self.shared.state()
    }

    /// Requests cancellation. Before the run starts this makes it settle as
    /// cancelled without packing anything.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn planned_passes(&self) -> u32 {
        self.options.planned_passes()
    }

    /// Runs to completion on the calling thread.
    pub fn execute<P: FnMut(u32, u32)>(self, mut on_progress: P) -> RunOutcome {
        self.drive(&mut on_progress)
    }

    /// Moves the run onto a worker thread and returns immediately.
    pub fn start<P, F>(self, mut on_progress: P, on_finish: F) -> RunHandle
    where
        P: FnMut(u32, u32) + Send + 'static,
        F: FnOnce(&RunOutcome) + Send + 'static,
    {
        self.shared.set_state(RunState::Running);
        let shared = Arc::clone(&self.shared);
        let worker = thread::spawn(move || {
            let outcome = self.drive(&mut on_progress);
            on_finish(&outcome);
            outcome
        });
        RunHandle { shared, worker }
    }

    fn drive(&self, on_progress: &mut dyn FnMut(u32, u32)) -> RunOutcome {
        let started = Instant::now();
        let deadline = started.checked_add(self.options.time_limit);
        self.shared.set_state(RunState::Running);

        let planned = self.planned_passes();
        let engine = PackingEngine::new(&self.sheet, &self.inventory);
        let sheet_area = self.sheet.sheet().area();
        let interrupt_check = || {
            if self.shared.is_cancelled() {
                Some(Interrupt::Cancelled)
            } else if deadline.is_some_and(|d| Instant::now() >= d) {
                Some(Interrupt::TimeLimit)
            } else {
                None
            }
        };

        tracing::debug!(
            units = self.inventory.unit_count(),
            planned,
            time_limit_ms = self.options.time_limit.as_millis() as u64,
            "optimization started"
        );

        let mut best: Option<(PassOutcome, &SharedPolicy)> = None;
        let mut partial: Option<(PassOutcome, &SharedPolicy)> = None;
        let mut completed = 0u32;
        let mut stopped: Option<Interrupt> = None;

        for policy in self.options.schedule.iter().take(planned as usize) {
            if let Some(reason) = interrupt_check() {
                stopped = Some(reason);
                break;
            }

            let outcome = engine.pack_until(&**policy, &interrupt_check);
            if let Some(reason) = outcome.interrupted {
                stopped = Some(reason);
                if best.is_none() {
                    partial = Some((outcome, policy));
                }
                break;
            }

            completed += 1;
            tracing::debug!(
                pass = completed,
                policy = %policy.name(),
                sheets = outcome.sheets_used,
                placed = outcome.placed.len(),
                "pass finished"
            );
            if best
                .as_ref()
                .is_none_or(|(b, _)| improves(&outcome, b, sheet_area))
            {
                best = Some((outcome, policy));
            }
            self.shared.iteration.store(completed, Ordering::Release);
            on_progress(completed, planned);

            // No heuristic can use fewer sheets than the placed area needs.
            if let Some((b, _)) = &best
                && b.sheets_used as u64 <= b.used_area.div_ceil(sheet_area)
            {
                tracing::debug!(sheets = b.sheets_used, "layout meets the area lower bound");
                break;
            }
        }

        let (outcome, policy, time_limited) = match (best, partial) {
            (Some((outcome, h)), _) => (outcome, Some(h), false),
            (None, Some((outcome, h))) => {
                let time_limited = outcome.interrupted == Some(Interrupt::TimeLimit);
                (outcome, Some(h), time_limited)
            }
            (None, None) => {
                // Stopped before the first pass began: every unit goes unattempted.
                let reason = stopped.unwrap_or(Interrupt::TimeLimit);
                let outcome = engine.pack_until(&Heuristic::default(), || Some(reason));
                (outcome, None, reason == Interrupt::TimeLimit)
            }
        };

        if let Err(violation) = verify::check(
            &self.sheet,
            &self.inventory,
            &outcome.placed,
            &outcome.unplaceable,
        ) {
            tracing::warn!(%violation, "layout failed self-check, discarding run");
            self.shared.set_state(RunState::Failed);
            return Err(OptimizeError::InvariantViolation(violation));
        }

        let status = if stopped == Some(Interrupt::Cancelled) {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };
        let result = OptimizationResult {
            stats: stats::all_sheet_stats(self.sheet.sheet(), &outcome.placed),
            placed_pieces: outcome.placed,
            unplaceable: outcome.unplaceable,
            meta: RunMeta {
                status,
                passes_completed: completed,
                planned_passes: planned,
                elapsed_ms: started.elapsed().as_millis() as u64,
                time_limited,
                heuristic: policy.map(|p| p.name()),
            },
        };

        let oversized = result.unplaceable_for(UnplaceableReason::ExceedsSheet);
        if oversized > 0 {
            tracing::warn!(count = oversized, "pieces larger than the sheet");
        }
        tracing::info!(
            status = ?status,
            passes = completed,
            sheets = result.sheet_count(),
            placed = result.placed_pieces.len(),
            unplaceable = result.unplaceable.len(),
            time_limited,
            elapsed_ms = result.meta.elapsed_ms,
            "optimization finished"
        );

        self.shared.set_state(match status {
            RunStatus::Completed => RunState::Completed,
            RunStatus::Cancelled => RunState::Cancelled,
        });
        Ok(result)
    }
}

/// More units placed, then fewer sheets, then higher efficiency. Full ties keep
/// the incumbent so earlier passes win.
fn improves(candidate: &PassOutcome, incumbent: &PassOutcome, sheet_area: u64) -> bool {
    if candidate.placed.len() != incumbent.placed.len() {
        return candidate.placed.len() > incumbent.placed.len();
    }
    if candidate.sheets_used != incumbent.sheets_used {
        return candidate.sheets_used < incumbent.sheets_used;
    }
    candidate.efficiency(sheet_area) > incumbent.efficiency(sheet_area)
}

/// Caller's view of a run started with [`OptimizationRun::start`].
#[derive(Debug)]
pub struct RunHandle {
    shared: Arc<RunShared>,
    worker: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn state(&self) -> RunState {
        self.shared.state()
    }

    /// Passes completed so far.
    pub fn iteration(&self) -> u32 {
        self.shared.iteration.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Blocks until the run settles.
    pub fn join(self) -> RunOutcome {
        match self.worker.join() {
            Ok(outcome) => outcome,
            Err(_) => {
                self.shared.set_state(RunState::Failed);
                Err(OptimizeError::WorkerPanicked)
            }
        }
    }
}

/// Factory for runs sharing one set of options.
#[derive(Debug, Clone, Default)]
pub struct OptimizationController {
    options: OptimizeOptions,
}

impl OptimizationController {
    pub fn new(options: OptimizeOptions) -> Self {
        Self { options }
    }

    pub fn prepare(&self, sheet: &Sheet, pieces: &[Piece]) -> Result<OptimizationRun, ValidationError> {
        OptimizationRun::new(sheet, pieces, self.options.clone())
    }

    pub fn start<P, F>(
        &self,
        sheet: &Sheet,
        pieces: &[Piece],
        on_progress: P,
        on_finish: F,
    ) -> Result<RunHandle, ValidationError>
    where
        P: FnMut(u32, u32) + Send + 'static,
        F: FnOnce(&RunOutcome) + Send + 'static,
    {
        Ok(self.prepare(sheet, pieces)?.start(on_progress, on_finish))
    }

    /// Synchronous run without progress reporting.
    pub fn optimize(&self, sheet: &Sheet, pieces: &[Piece]) -> RunOutcome {
        self.prepare(sheet, pieces)?.execute(|_, _| {})
    }
}

/// Starts a run with the default schedule and the given time budget.
pub fn run<P, F>(
    sheet: &Sheet,
    pieces: &[Piece],
    time_limit_ms: u64,
    on_progress: P,
    on_finish: F,
) -> Result<RunHandle, ValidationError>
where
    P: FnMut(u32, u32) + Send + 'static,
    F: FnOnce(&RunOutcome) + Send + 'static,
{
    OptimizationController::new(OptimizeOptions::default().with_time_limit_ms(time_limit_ms))
        .start(sheet, pieces, on_progress, on_finish)
}

pub fn cancel(handle: &RunHandle) {
    handle.cancel();
}
