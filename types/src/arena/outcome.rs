use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use super::{DIE_FACES, LUCKY_TOTAL};

/// One of the three things a player can stake on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Total above seven.
    Big,
    /// Total below seven.
    Small,
    /// Total of exactly seven.
    Lucky,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Big, Outcome::Small, Outcome::Lucky];

    /// Winning outcome for a two-die total.
    pub fn from_total(total: u8) -> Self {
        match total {
            t if t == LUCKY_TOTAL => Outcome::Lucky,
            t if t > LUCKY_TOTAL => Outcome::Big,
            _ => Outcome::Small,
        }
    }

    /// Gross return per staked point when this outcome wins.
    pub fn multiplier(&self) -> u64 {
        match self {
            Outcome::Big | Outcome::Small => 2,
            Outcome::Lucky => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Big => "big",
            Outcome::Small => "small",
            Outcome::Lucky => "lucky",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
#[error("unknown outcome: {0}")]
pub struct UnknownOutcome(pub String);

impl FromStr for Outcome {
    type Err = UnknownOutcome;

    /// Accepts the full names and the single-letter shorthands players type
    /// in chat (`b`, `s`, `l`), case-insensitively.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "big" | "b" => Ok(Outcome::Big),
            "small" | "s" => Ok(Outcome::Small),
            "lucky" | "l" => Ok(Outcome::Lucky),
            _ => Err(UnknownOutcome(value.to_string())),
        }
    }
}

/// A two-die roll. Both faces are always within `1..=6`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Dice {
    d1: u8,
    d2: u8,
}

impl Dice {
    /// Returns `None` unless both faces are valid die values.
    pub fn new(d1: u8, d2: u8) -> Option<Self> {
        if is_face(d1) && is_face(d2) {
            Some(Self { d1, d2 })
        } else {
            None
        }
    }

    /// Build a roll from zero-based face offsets, each taken modulo six.
    pub fn from_offsets(o1: u8, o2: u8) -> Self {
        Self {
            d1: o1 % DIE_FACES + 1,
            d2: o2 % DIE_FACES + 1,
        }
    }

    pub fn faces(&self) -> [u8; 2] {
        [self.d1, self.d2]
    }

    pub fn total(&self) -> u8 {
        self.d1 + self.d2
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::from_total(self.total())
    }
}

/// Whether `value` can appear on a six-sided die.
pub fn is_face(value: u8) -> bool {
    (1..=DIE_FACES).contains(&value)
}
