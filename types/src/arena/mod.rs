//! Arena domain types.
//!
//! Defines the account/round/history/event/error types shared by the round
//! engine and the live-table service.

mod config;
mod constants;
mod error;
mod event;
mod outcome;
mod player;
mod round;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use event::*;
pub use outcome::*;
pub use player::*;
pub use round::*;
