//! Operating-system die source and the timed prefetch used before a roll.

use std::time::Duration;

use dicearena_execution::{DieSource, DieSourceError, PrefetchedDice};
use dicearena_types::DIE_FACES;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;

/// Bytes at or above the largest multiple of six in `0..=256` are redrawn.
const ACCEPT_BELOW: u8 = (256 / DIE_FACES as u16 * DIE_FACES as u16) as u8;
const MAX_ATTEMPTS: usize = 64;

/// Uniform die values from the OS entropy source.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsDieSource;

impl DieSource for OsDieSource {
    fn roll_one(&mut self) -> Result<u8, DieSourceError> {
        let mut byte = [0u8; 1];
        for _ in 0..MAX_ATTEMPTS {
            OsRng
                .try_fill_bytes(&mut byte)
                .map_err(|err| DieSourceError::Unavailable(err.to_string()))?;
            if byte[0] < ACCEPT_BELOW {
                return Ok(byte[0] % DIE_FACES + 1);
            }
        }
        Err(DieSourceError::Unavailable(
            "rejection sampling did not converge".to_string(),
        ))
    }
}

/// Draw two dice from the OS on a blocking task, giving up after `timeout`.
pub async fn prefetch_dice(timeout: Duration) -> PrefetchedDice {
    prefetch_with(timeout, || {
        let mut source = OsDieSource;
        (source.roll_one(), source.roll_one())
    })
    .await
}

/// Run `draw` on the blocking pool under `timeout`.
///
/// Timeouts and panics in `draw` become an unavailable prefetch; the engine
/// then rolls from its fallback RNG.
pub async fn prefetch_with<F>(timeout: Duration, draw: F) -> PrefetchedDice
where
    F: FnOnce() -> (Result<u8, DieSourceError>, Result<u8, DieSourceError>) + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(draw)).await {
        Ok(Ok((first, second))) => PrefetchedDice::new(first, second),
        Ok(Err(err)) => {
            warn!(?err, "die draw task failed");
            PrefetchedDice::unavailable(DieSourceError::Unavailable(err.to_string()))
        }
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "die draw timed out");
            PrefetchedDice::unavailable(DieSourceError::TimedOut)
        }
    }
}
