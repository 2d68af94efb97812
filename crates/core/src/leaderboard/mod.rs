//! Exercise rankings and the gym-wall leaderboard.

mod ranking;

pub use ranking::*;
