//! Die sources and the local fallback.

use dicearena_types::{is_face, Dice, DIE_FACES};
use rand::rngs::StdRng;
use rand::Rng;
use thiserror::Error as ThisError;
use tracing::warn;

#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum DieSourceError {
    #[error("entropy source unavailable: {0}")]
    Unavailable(String),
    #[error("die source timed out")]
    TimedOut,
    #[error("die value {0} is not a face of a six-sided die")]
    OutOfRange(u8),
}

/// Fallible source of one fair die value in `1..=6`.
pub trait DieSource {
    fn roll_one(&mut self) -> Result<u8, DieSourceError>;
}

/// Two draws taken ahead of time, replayed in order.
///
/// The live-table service fills this outside the arena lock so that slow
/// entropy never blocks a chat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefetchedDice {
    draws: [Result<u8, DieSourceError>; 2],
    next: usize,
}

impl PrefetchedDice {
    pub fn new(first: Result<u8, DieSourceError>, second: Result<u8, DieSourceError>) -> Self {
        Self {
            draws: [first, second],
            next: 0,
        }
    }

    /// A prefetch that failed as a whole.
    pub fn unavailable(err: DieSourceError) -> Self {
        Self::new(Err(err.clone()), Err(err))
    }
}

impl DieSource for PrefetchedDice {
    fn roll_one(&mut self) -> Result<u8, DieSourceError> {
        let draw = self
            .draws
            .get(self.next)
            .cloned()
            .unwrap_or_else(|| Err(DieSourceError::Unavailable("prefetch exhausted".into())));
        self.next = self.next.saturating_add(1);
        draw
    }
}

fn draw_pair<D: DieSource + ?Sized>(source: &mut D) -> Result<Dice, DieSourceError> {
    let d1 = source.roll_one()?;
    let d2 = source.roll_one()?;
    Dice::new(d1, d2).ok_or(DieSourceError::OutOfRange(if is_face(d1) { d2 } else { d1 }))
}

/// Draw both dice from `source`.
///
/// If either draw fails or lands outside `1..=6`, both dice are redrawn from
/// `fallback`. Returns the roll and whether the fallback was used.
pub fn roll_pair<D: DieSource + ?Sized>(source: &mut D, fallback: &mut StdRng) -> (Dice, bool) {
    match draw_pair(source) {
        Ok(dice) => (dice, false),
        Err(err) => {
            warn!(%err, "die source failed, using fallback rng");
            (fallback_pair(fallback), true)
        }
    }
}

fn fallback_pair(rng: &mut StdRng) -> Dice {
    Dice::from_offsets(rng.gen_range(0..DIE_FACES), rng.gen_range(0..DIE_FACES))
}
