//! Chat id to arena map, and the single entry point for commands and timers.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dicearena_execution::{
    BalanceAdjustment, BetConfirmation, ChatArena, PrefetchedDice, RoundEngine, RoundOpening,
    Scheduler, SequenceStart, SequenceState, Timer,
};
use dicearena_types::{ArenaConfig, ArenaError, ArenaEvent, ChatId, Outcome, PlayerId};
use tokio::sync::broadcast;
use tracing::{debug, info};

pub type SharedScheduler = Arc<dyn Scheduler + Send + Sync>;

type Engine<'a> = RoundEngine<'a, dyn Scheduler + Send + Sync, Vec<ArenaEvent>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns every arena in the process.
///
/// Each arena sits behind its own mutex, so steps for one chat are
/// serialized while different chats proceed in parallel. Events produced by
/// a step are published before the arena lock is released, which keeps
/// per-chat event order identical to step order.
pub struct ArenaRegistry {
    config: ArenaConfig,
    allowed: Option<BTreeSet<ChatId>>,
    scheduler: SharedScheduler,
    arenas: Mutex<HashMap<ChatId, Arc<Mutex<ChatArena>>>>,
    next_generation: AtomicU64,
    events: broadcast::Sender<ArenaEvent>,
}

impl ArenaRegistry {
    pub fn new(
        config: ArenaConfig,
        allowed: Option<BTreeSet<ChatId>>,
        scheduler: SharedScheduler,
        event_buffer: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            config,
            allowed,
            scheduler,
            arenas: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
            events,
        }
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ArenaEvent> {
        self.events.subscribe()
    }

    pub fn chat_count(&self) -> usize {
        lock(&self.arenas).len()
    }

    pub fn contains(&self, chat_id: ChatId) -> bool {
        lock(&self.arenas).contains_key(&chat_id)
    }

    fn check_allowed(&self, chat_id: ChatId) -> Result<(), ArenaError> {
        match &self.allowed {
            Some(allowed) if !allowed.contains(&chat_id) => {
                Err(ArenaError::ChatNotAllowed(chat_id))
            }
            _ => Ok(()),
        }
    }

    /// Arena for `chat_id`, created on first use.
    fn arena(&self, chat_id: ChatId) -> Result<Arc<Mutex<ChatArena>>, ArenaError> {
        self.check_allowed(chat_id)?;
        let mut arenas = lock(&self.arenas);
        let arena = arenas.entry(chat_id).or_insert_with(|| {
            let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
            info!(chat_id, generation, "arena created");
            let arena = ChatArena::new(chat_id, rand::random()).with_generation(generation);
            Arc::new(Mutex::new(arena))
        });
        Ok(arena.clone())
    }

    fn existing(&self, chat_id: ChatId) -> Option<Arc<Mutex<ChatArena>>> {
        lock(&self.arenas).get(&chat_id).cloned()
    }

    fn publish(&self, events: Vec<ArenaEvent>) {
        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }

    /// Run one engine step against the arena, creating it if needed.
    fn step<T, F>(&self, chat_id: ChatId, f: F) -> Result<T, ArenaError>
    where
        F: FnOnce(&mut Engine<'_>) -> Result<T, ArenaError>,
    {
        let arena = self.arena(chat_id)?;
        let mut arena = lock(&arena);
        let mut events = Vec::new();
        let result = {
            let mut engine =
                RoundEngine::new(&mut arena, &self.config, self.scheduler.as_ref(), &mut events);
            f(&mut engine)
        };
        self.publish(events);
        result
    }

    /// Read-only access to an arena, creating it if needed.
    pub fn query<T>(
        &self,
        chat_id: ChatId,
        f: impl FnOnce(&ChatArena) -> T,
    ) -> Result<T, ArenaError> {
        let arena = self.arena(chat_id)?;
        let arena = lock(&arena);
        Ok(f(&*arena))
    }

    pub fn open_round(&self, chat_id: ChatId, now_ms: u64) -> Result<RoundOpening, ArenaError> {
        self.step(chat_id, |engine| engine.open_round(now_ms))
    }

    pub fn place_bet(
        &self,
        chat_id: ChatId,
        player: PlayerId,
        display_name: &str,
        outcome: Outcome,
        amount: u64,
        now_ms: u64,
    ) -> Result<BetConfirmation, ArenaError> {
        self.step(chat_id, |engine| {
            engine.place_bet(player, display_name, outcome, amount, now_ms)
        })
    }

    pub fn start_sequence(&self, chat_id: ChatId, count: u32) -> Result<SequenceStart, ArenaError> {
        self.step(chat_id, |engine| engine.start_sequence(count))
    }

    pub fn stop_round(
        &self,
        chat_id: ChatId,
        now_ms: u64,
    ) -> Result<BTreeMap<PlayerId, u64>, ArenaError> {
        self.step(chat_id, |engine| engine.stop_round(now_ms))
    }

    pub fn cancel_sequence(&self, chat_id: ChatId) -> Result<SequenceState, ArenaError> {
        self.step(chat_id, |engine| engine.cancel_sequence())
    }

    pub fn adjust_balance(
        &self,
        chat_id: ChatId,
        player: PlayerId,
        display_name: &str,
        delta: i64,
        now_ms: u64,
    ) -> Result<BalanceAdjustment, ArenaError> {
        self.step(chat_id, |engine| {
            engine.adjust_balance(player, display_name, delta, now_ms)
        })
    }

    /// Deliver a fired timer. Timers never create arenas; a timer for a chat
    /// that has been removed is dropped.
    pub fn fire(&self, timer: Timer, mut dice: PrefetchedDice, now_ms: u64) -> bool {
        let Some(arena) = self.existing(timer.chat_id) else {
            debug!(chat_id = timer.chat_id, kind = timer.kind.as_str(), "timer for unknown chat");
            return false;
        };
        let mut arena = lock(&arena);
        let mut events = Vec::new();
        let acted = RoundEngine::new(&mut arena, &self.config, self.scheduler.as_ref(), &mut events)
            .fire(timer, &mut dice, now_ms);
        self.publish(events);
        acted
    }

    /// Drop a chat's arena after cancelling its timers. Returns whether it existed.
    pub fn remove_chat(&self, chat_id: ChatId) -> bool {
        let Some(arena) = lock(&self.arenas).remove(&chat_id) else {
            return false;
        };
        let mut arena = lock(&arena);
        let mut events = Vec::new();
        RoundEngine::new(&mut arena, &self.config, self.scheduler.as_ref(), &mut events).teardown();
        info!(chat_id, "arena removed");
        true
    }
}
