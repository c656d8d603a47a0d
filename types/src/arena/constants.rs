/// Balance granted to a player the first time they are seen in a chat.
pub const INITIAL_BALANCE: u64 = 1_000;

/// Smallest accepted stake.
pub const MIN_BET: u64 = 1;

/// Largest accepted stake per placement.
pub const MAX_BET: u64 = 5_000;

/// Stake used when a bet arrives without an explicit amount (quick-bet buttons).
pub const QUICK_BET_AMOUNT: u64 = 100;

/// Betting window of a freshly opened round.
pub const BETTING_WINDOW_MS: u64 = 60_000;

/// Delay between closing bets and rolling the dice.
pub const ROLL_DELAY_MS: u64 = 10_000;

/// Delay between a sequence being requested and its first round opening.
pub const SEQUENCE_START_DELAY_MS: u64 = 2_000;

/// Delay between a settled round and the next round of a sequence.
pub const INTER_ROUND_DELAY_MS: u64 = 5_000;

/// Upper bound on the number of rounds one sequence may request.
pub const MAX_SEQUENCE_ROUNDS: u32 = 20;

/// Number of settled rounds kept in a chat's history.
pub const HISTORY_CAPACITY: usize = 20;

/// Consecutive empty rounds after which a running sequence stops itself.
pub const IDLE_ROUND_LIMIT: u32 = 3;

/// Default number of rows returned by the leaderboard query.
pub const LEADERBOARD_SIZE: usize = 10;

/// Default number of rows returned by the history query.
pub const RECENT_HISTORY_SIZE: usize = 5;

/// Number of faces on a die.
pub const DIE_FACES: u8 = 6;

/// Total that pays the lucky outcome.
pub const LUCKY_TOTAL: u8 = 7;
