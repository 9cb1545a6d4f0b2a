use crate::error::{ConfigError, check_unit};
use crate::features::{StateKey, encode};
use crate::game::{EndReason, Game, GameConfig, Step};
use crate::policy::{self, action_dir};
use crate::qtable::QTable;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub food: f32,
    pub death: f32,
    /// Charged on every step that neither eats nor dies.
    pub step: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self { food: 10.0, death: -10.0, step: -0.1 }
    }
}

impl RewardConfig {
    pub fn reward(&self, old_score: usize, new_score: usize, terminal: bool) -> f32 {
        if new_score > old_score {
            self.food
        } else if terminal {
            self.death
        } else {
            self.step
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: usize,
    pub learning_rate: f32,
    pub discount: f32,
    pub epsilon_start: f32,
    pub epsilon_decay: f32,
    pub epsilon_min: f32,
    /// Progress is logged every this many episodes; 0 disables it.
    pub log_every: usize,
    /// Ends an episode early after this many steps. Off by default.
    pub max_steps_per_episode: Option<usize>,
    pub rewards: RewardConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 300,
            learning_rate: 0.1,
            discount: 0.99,
            epsilon_start: 1.0,
            epsilon_decay: 0.995,
            epsilon_min: 0.01,
            log_every: 10,
            max_steps_per_episode: None,
            rewards: RewardConfig::default(),
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("learning_rate", self.learning_rate)?;
        check_unit("discount", self.discount)?;
        check_unit("epsilon_start", self.epsilon_start)?;
        check_unit("epsilon_decay", self.epsilon_decay)?;
        check_unit("epsilon_min", self.epsilon_min)?;
        if self.epsilon_min > self.epsilon_start {
            return Err(ConfigError::ExplorationFloor {
                start: self.epsilon_start,
                min: self.epsilon_min,
            });
        }
        Ok(())
    }
}

/// One interaction with the game and the update it produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    pub state: StateKey,
    pub action: usize,
    pub reward: f32,
    pub next_state: StateKey,
    pub step: Step,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub score: usize,
    pub reward: f32,
    pub steps: usize,
    /// `None` when the step cap cut the episode short.
    pub reason: Option<EndReason>,
    /// Exploration rate the episode was played with.
    pub epsilon: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrainingReport {
    pub episodes: usize,
    pub interrupted: bool,
    pub best_score: usize,
    pub mean_score: f64,
    pub states: usize,
}

/// Online one-step Q-learning against a single game.
pub struct Trainer {
    config: TrainingConfig,
    table: QTable,
    game: Game,
    state: StateKey,
    epsilon: f32,
    episode: usize,
    episode_reward: f32,
    episode_steps: usize,
    rng: SmallRng,
}

impl Trainer {
    pub fn new(
        game_config: GameConfig,
        config: TrainingConfig,
        table: QTable,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = seed.map_or_else(SmallRng::from_entropy, SmallRng::seed_from_u64);
        let game = Game::seeded(game_config, rng.r#gen())?;
        let state = encode(&game.snapshot());
        Ok(Self {
            epsilon: config.epsilon_start,
            config,
            table,
            game,
            state,
            episode: 0,
            episode_reward: 0.0,
            episode_steps: 0,
            rng,
        })
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn into_table(self) -> QTable {
        self.table
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Episodes finished so far.
    pub fn episode(&self) -> usize {
        self.episode
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Plays one action, applies the TD update, and closes the episode if
    /// it ended.
    pub fn step(&mut self) -> (Transition, Option<EpisodeSummary>) {
        let state = self.state;
        let action = policy::select(&self.table.get(state), self.epsilon, &mut self.rng);

        let old_score = self.game.score();
        self.game.set_direction(action_dir(action));
        let step = self.game.step();
        let new_score = self.game.score();
        let terminal = self.game.is_terminal();
        let reward = self.config.rewards.reward(old_score, new_score, terminal);

        let next_state = encode(&self.game.snapshot());
        self.learn(state, action, reward, next_state);
        self.state = next_state;
        self.episode_reward += reward;
        self.episode_steps += 1;

        let capped = self.config.max_steps_per_episode.is_some_and(|cap| self.episode_steps >= cap);
        let done = (terminal || capped).then(|| self.finish_episode());
        (Transition { state, action, reward, next_state, step }, done)
    }

    pub fn run_episode(&mut self) -> EpisodeSummary {
        loop {
            if let (_, Some(summary)) = self.step() {
                return summary;
            }
        }
    }

    /// Trains for the configured number of episodes or until `stop` is set.
    /// An interrupted episode is dropped without decaying exploration; the
    /// table keeps every update made so far.
    pub fn run(&mut self, stop: &AtomicBool) -> TrainingReport {
        let mut scores = Vec::new();
        let mut window_reward = 0.0f32;
        let mut interrupted = false;

        'episodes: while scores.len() < self.config.episodes {
            let summary = loop {
                if stop.load(Ordering::Relaxed) {
                    interrupted = true;
                    break 'episodes;
                }
                if let (_, Some(summary)) = self.step() {
                    break summary;
                }
            };
            debug!(
                episode = summary.episode,
                score = summary.score,
                steps = summary.steps,
                reason = ?summary.reason,
                "episode finished"
            );
            scores.push(summary.score);
            window_reward += summary.reward;

            let every = self.config.log_every;
            if every > 0 && scores.len() % every == 0 {
                let recent = &scores[scores.len() - every..];
                let avg_score = recent.iter().sum::<usize>() as f64 / every as f64;
                info!(
                    episode = summary.episode + 1,
                    avg_reward = window_reward / every as f32,
                    avg_score,
                    epsilon = self.epsilon,
                    states = self.table.len(),
                    "training progress"
                );
                window_reward = 0.0;
            }
        }

        if interrupted {
            self.abandon_episode();
            info!(completed = scores.len(), "training interrupted");
        }

        let mean_score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<usize>() as f64 / scores.len() as f64
        };
        TrainingReport {
            episodes: scores.len(),
            interrupted,
            best_score: scores.iter().copied().max().unwrap_or(0),
            mean_score,
            states: self.table.len(),
        }
    }

    /// Restarts the game without counting the unfinished episode.
    pub fn abandon_episode(&mut self) {
        self.begin_episode();
    }

    fn learn(&mut self, state: StateKey, action: usize, reward: f32, next_state: StateKey) {
        let old_q = self.table.get(state)[action];
        let next_max = self.table.get(next_state).into_iter().fold(f32::NEG_INFINITY, f32::max);
        let target = reward + self.config.discount * next_max;
        let new_q = old_q + self.config.learning_rate * (target - old_q);
        self.table.update(state, action, new_q);
    }

    fn finish_episode(&mut self) -> EpisodeSummary {
        let summary = EpisodeSummary {
            episode: self.episode,
            score: self.game.score(),
            reward: self.episode_reward,
            steps: self.episode_steps,
            reason: self.game.outcome(),
            epsilon: self.epsilon,
        };
        self.episode += 1;
        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);
        self.begin_episode();
        summary
    }

    fn begin_episode(&mut self) {
        self.game.reset();
        self.state = encode(&self.game.snapshot());
        self.episode_reward = 0.0;
        self.episode_steps = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURES;

    fn quick() -> TrainingConfig {
        TrainingConfig {
            episodes: 5,
            log_every: 0,
            max_steps_per_episode: Some(400),
            ..Default::default()
        }
    }

    fn trainer(config: TrainingConfig, table: QTable) -> Trainer {
        let game = GameConfig::new(10, 10, 0.0, 0).unwrap();
        Trainer::new(game, config, table, Some(5)).unwrap()
    }

    #[test]
    fn reward_prefers_food_over_death() {
        let r = RewardConfig::default();
        assert_eq!(r.reward(0, 1, false), 10.0);
        assert_eq!(r.reward(0, 1, true), 10.0);
        assert_eq!(r.reward(2, 2, true), -10.0);
        assert_eq!(r.reward(2, 2, false), -0.1);
    }

    #[test]
    fn validate_rejects_out_of_range_knobs() {
        let bad = TrainingConfig { learning_rate: 1.5, ..Default::default() };
        assert!(matches!(bad.validate(), Err(ConfigError::Rate { name: "learning_rate", .. })));
        let bad = TrainingConfig { epsilon_start: 0.1, epsilon_min: 0.5, ..Default::default() };
        assert!(matches!(bad.validate(), Err(ConfigError::ExplorationFloor { .. })));
        assert!(TrainingConfig::default().validate().is_ok());
    }

    #[test]
    fn td_update_moves_toward_the_target() {
        let s = StateKey::from_bits([false; FEATURES]);
        let ns = StateKey::from_bits([true; FEATURES]);
        let mut table = QTable::new();
        for (a, v) in [1.0, 2.0, 3.0, 4.0].into_iter().enumerate() {
            table.update(ns, a, v);
        }
        let config = TrainingConfig { learning_rate: 0.5, discount: 0.9, ..quick() };
        let mut t = trainer(config, table);
        t.learn(s, 2, 10.0, ns);
        // target = 10 + 0.9 * 4 = 13.6, halfway from 0
        let q = t.table().get(s)[2];
        assert!((q - 6.8).abs() < 1e-5, "got {q}");
        assert_eq!(t.table().get(s)[0], 0.0);
    }

    #[test]
    fn zero_learning_rate_never_changes_stored_values() {
        let mut table = QTable::new();
        for raw in 0..64u16 {
            let mut bits = [false; FEATURES];
            for (i, b) in bits.iter_mut().enumerate() {
                *b = (raw >> i) & 1 == 1;
            }
            table.update(StateKey::from_bits(bits), (raw % 4) as usize, raw as f32 - 30.0);
        }
        let before = table.clone();
        let config = TrainingConfig { learning_rate: 0.0, ..quick() };
        let mut t = trainer(config, table);
        for _ in 0..500 {
            t.step();
        }
        for (key, values) in t.table().iter() {
            assert_eq!(*values, before.get(key), "key {key} changed");
        }
    }

    #[test]
    fn exploration_decays_to_the_floor() {
        let config = TrainingConfig {
            epsilon_start: 1.0,
            epsilon_decay: 0.5,
            epsilon_min: 0.2,
            ..quick()
        };
        let mut t = trainer(config, QTable::new());
        let seen: Vec<f32> = (0..4).map(|_| t.run_episode().epsilon).collect();
        assert_eq!(seen, vec![1.0, 0.5, 0.25, 0.2]);
        assert_eq!(t.epsilon(), 0.2);
        assert_eq!(t.episode(), 4);
    }

    #[test]
    fn run_reports_every_episode() {
        let stop = AtomicBool::new(false);
        let mut t = trainer(quick(), QTable::new());
        let report = t.run(&stop);
        assert_eq!(report.episodes, 5);
        assert!(!report.interrupted);
        assert!(report.states > 0);
        assert_eq!(report.states, t.table().len());
    }

    #[test]
    fn stop_flag_interrupts_before_any_step() {
        let stop = AtomicBool::new(true);
        let mut t = trainer(quick(), QTable::new());
        let report = t.run(&stop);
        assert!(report.interrupted);
        assert_eq!(report.episodes, 0);
        assert_eq!(t.epsilon(), 1.0);
        assert!(t.table().is_empty());
    }

    #[test]
    fn step_cap_closes_an_episode_without_a_reason() {
        let config = TrainingConfig { max_steps_per_episode: Some(1), ..quick() };
        let mut t = trainer(config, QTable::new());
        let summary = t.run_episode();
        assert_eq!(summary.steps, 1);
        // One step from the centre of a calm board cannot hit anything.
        assert_eq!(summary.reason, None);
    }
}
