//! Snake on a bounded grid with hazards, plus a tabular Q-learning agent.
//!
//! - `game`: deterministic simulation engine
//! - `features`: snapshot → 11-bit state key
//! - `qtable`: value table with load/merge/persist
//! - `policy`: epsilon-greedy action selection
//! - `trainer`: online Q-learning loop
//! - `lookahead`, `pilot`: non-learning players built on the engine
//! - `render`, `app`: pixel view and windowed front end

pub mod app;
pub mod config;
pub mod error;
pub mod features;
pub mod game;
pub mod lookahead;
pub mod pilot;
pub mod policy;
pub mod qtable;
pub mod render;
pub mod trainer;

pub use config::Config;
pub use error::ConfigError;
pub use features::{StateKey, encode};
pub use game::{Dir, EndReason, Game, GameConfig, Pos, Snapshot, Step};
pub use qtable::QTable;
pub use trainer::{Trainer, TrainingConfig};
