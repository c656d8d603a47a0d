//! Test doubles for the engine's collaborators.
//!
//! Enabled for unit tests and, via the `mocks` feature, for downstream crates.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dicearena_types::{ArenaConfig, ArenaEvent, ChatId};

use crate::arena::ChatArena;
use crate::dice::{DieSource, DieSourceError};
use crate::engine::RoundEngine;
use crate::scheduler::{Scheduler, Timer, TimerHandle};

#[derive(Debug, Default)]
struct ManualState {
    now_ms: u64,
    next_id: u64,
    pending: BTreeMap<TimerHandle, (u64, Timer)>,
}

/// Scheduler driven by a virtual clock. Nothing fires until the test pops it.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn now_ms(&self) -> u64 {
        self.lock().now_ms
    }

    /// Pending timers as `(due_ms, timer)`, earliest first.
    pub fn pending(&self) -> Vec<(u64, Timer)> {
        let state = self.lock();
        let mut pending: Vec<(u64, TimerHandle, Timer)> = state
            .pending
            .iter()
            .map(|(handle, (due, timer))| (*due, *handle, *timer))
            .collect();
        pending.sort_by_key(|(due, handle, _)| (*due, *handle));
        pending.into_iter().map(|(due, _, timer)| (due, timer)).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Remove the earliest pending timer and move the clock to its due time.
    pub fn pop_next(&self) -> Option<(u64, Timer)> {
        let mut state = self.lock();
        let (handle, due) = state
            .pending
            .iter()
            .map(|(handle, (due, _))| (*handle, *due))
            .min_by_key(|(handle, due)| (*due, *handle))?;
        let (_, timer) = state.pending.remove(&handle)?;
        state.now_ms = state.now_ms.max(due);
        Some((state.now_ms, timer))
    }

    /// Like [`pop_next`](Self::pop_next) but only if the timer is due by `until_ms`.
    pub fn pop_due(&self, until_ms: u64) -> Option<(u64, Timer)> {
        let next_due = self.pending().first().map(|(due, _)| *due)?;
        if next_due > until_ms {
            return None;
        }
        self.pop_next()
    }

    /// Move the clock forward without firing anything.
    pub fn set_now(&self, now_ms: u64) {
        let mut state = self.lock();
        state.now_ms = state.now_ms.max(now_ms);
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, timer: Timer) -> TimerHandle {
        let mut state = self.lock();
        state.next_id += 1;
        let handle = TimerHandle(state.next_id);
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let due = state.now_ms.saturating_add(delay_ms);
        state.pending.insert(handle, (due, timer));
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        self.lock().pending.remove(&handle);
    }
}

/// Die source replaying a fixed script, then failing.
#[derive(Clone, Debug, Default)]
pub struct ScriptedDice {
    script: VecDeque<Result<u8, DieSourceError>>,
}

impl ScriptedDice {
    pub fn empty() -> Self {
        Self::default()
    }

    /// One entry per round.
    pub fn rolls(rolls: &[(u8, u8)]) -> Self {
        let script = rolls
            .iter()
            .flat_map(|(d1, d2)| [Ok(*d1), Ok(*d2)])
            .collect();
        Self { script }
    }

    pub fn push(&mut self, draw: Result<u8, DieSourceError>) {
        self.script.push_back(draw);
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl DieSource for ScriptedDice {
    fn roll_one(&mut self) -> Result<u8, DieSourceError> {
        self.script
            .pop_front()
            .unwrap_or_else(|| Err(DieSourceError::Unavailable("script exhausted".into())))
    }
}

/// Die source that always fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingDice;

impl DieSource for FailingDice {
    fn roll_one(&mut self) -> Result<u8, DieSourceError> {
        Err(DieSourceError::Unavailable("offline".into()))
    }
}

/// One arena wired to a manual scheduler, collecting its events.
pub struct TestTable {
    pub arena: ChatArena,
    pub config: ArenaConfig,
    pub scheduler: ManualScheduler,
    pub events: Vec<ArenaEvent>,
    pub dice: ScriptedDice,
}

impl TestTable {
    pub fn new(chat_id: ChatId, config: ArenaConfig) -> Self {
        Self {
            arena: ChatArena::new(chat_id, 0x5eed),
            config,
            scheduler: ManualScheduler::new(),
            events: Vec::new(),
            dice: ScriptedDice::empty(),
        }
    }

    pub fn with_rolls(mut self, rolls: &[(u8, u8)]) -> Self {
        self.dice = ScriptedDice::rolls(rolls);
        self
    }

    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    pub fn engine(&mut self) -> RoundEngine<'_, ManualScheduler, Vec<ArenaEvent>> {
        RoundEngine::new(
            &mut self.arena,
            &self.config,
            &self.scheduler,
            &mut self.events,
        )
    }

    /// Fire the earliest pending timer. Returns it along with whether it
    /// changed the arena.
    pub fn fire_next(&mut self) -> Option<(Timer, bool)> {
        let (now_ms, timer) = self.scheduler.pop_next()?;
        let acted = RoundEngine::new(
            &mut self.arena,
            &self.config,
            &self.scheduler,
            &mut self.events,
        )
        .fire(timer, &mut self.dice, now_ms);
        Some((timer, acted))
    }

    /// Fire every timer due by `until_ms`, including ones scheduled while
    /// firing, then park the clock at `until_ms`.
    pub fn run_until(&mut self, until_ms: u64) -> usize {
        let mut fired = 0;
        while let Some((now_ms, timer)) = self.scheduler.pop_due(until_ms) {
            RoundEngine::new(
                &mut self.arena,
                &self.config,
                &self.scheduler,
                &mut self.events,
            )
            .fire(timer, &mut self.dice, now_ms);
            fired += 1;
        }
        self.scheduler.set_now(until_ms);
        fired
    }

    /// Fire timers until none remain, bounded by `max_steps`.
    pub fn run_until_idle(&mut self, max_steps: usize) -> usize {
        let mut fired = 0;
        while fired < max_steps && self.fire_next().is_some() {
            fired += 1;
        }
        fired
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.iter().map(ArenaEvent::name).collect()
    }

    pub fn balance(&self, player: i64) -> Option<u64> {
        self.arena.ledger().get(player).map(|account| account.balance)
    }
}
