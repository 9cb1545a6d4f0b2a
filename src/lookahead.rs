//! Monte-Carlo lookahead: score each heading by replaying random futures on
//! forked copies of the game.

use crate::error::ConfigError;
use crate::game::{Dir, Game};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookaheadConfig {
    /// Futures simulated per candidate heading.
    pub rollouts: usize,
    /// Steps per future, the first one included.
    pub depth: usize,
}

impl Default for LookaheadConfig {
    fn default() -> Self {
        Self { rollouts: 5, depth: 10 }
    }
}

impl LookaheadConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rollouts == 0 || self.depth == 0 {
            return Err(ConfigError::Lookahead { rollouts: self.rollouts, depth: self.depth });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Future {
    pub survived: bool,
    /// Manhattan distance from head to food at the end; infinite when dead
    /// or when there is no food.
    pub distance: f64,
    pub score_gained: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evaluation {
    pub dir: Dir,
    pub survived: usize,
    pub avg_distance: f64,
    pub avg_score: f64,
}

impl Evaluation {
    pub fn value(&self) -> f64 {
        self.avg_score * 5000.0 + self.survived as f64 * 200.0 - self.avg_distance
    }
}

/// Plays `dir` then `depth - 1` random headings on a fork of `game`.
pub fn simulate_future<R: Rng + ?Sized>(game: &Game, dir: Dir, depth: usize, rng: &mut R) -> Future {
    let mut sim = game.fork();
    sim.reseed(rng.r#gen());
    sim.set_direction(dir);
    sim.step();
    if sim.is_terminal() {
        return Future { survived: false, distance: f64::INFINITY, score_gained: 0 };
    }

    for _ in 1..depth {
        if sim.is_terminal() {
            break;
        }
        if let Some(&d) = Dir::ALL.choose(rng) {
            sim.set_direction(d);
        }
        sim.step();
    }

    let distance = match sim.food() {
        Some(food) => sim.head().manhattan(food) as f64,
        None => f64::INFINITY,
    };
    Future {
        survived: !sim.is_terminal(),
        distance,
        score_gained: sim.score() - game.score(),
    }
}

pub fn evaluate<R: Rng + ?Sized>(game: &Game, dir: Dir, config: &LookaheadConfig, rng: &mut R) -> Evaluation {
    let mut survived = 0;
    let mut total_distance = 0.0;
    let mut total_score = 0;
    for _ in 0..config.rollouts {
        let future = simulate_future(game, dir, config.depth, rng);
        if future.survived {
            survived += 1;
            total_distance += future.distance;
        }
        total_score += future.score_gained;
    }
    let avg_distance = if survived > 0 { total_distance / survived as f64 } else { f64::INFINITY };
    Evaluation {
        dir,
        survived,
        avg_distance,
        avg_score: total_score as f64 / config.rollouts as f64,
    }
}

/// Candidate headings are every direction except the reverse of the
/// current one, scored in parallel. The first best candidate in
/// up/down/left/right order wins.
pub struct LookaheadBot {
    config: LookaheadConfig,
    rng: SmallRng,
}

impl LookaheadBot {
    pub fn new(config: LookaheadConfig, seed: Option<u64>) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = seed.map_or_else(SmallRng::from_entropy, SmallRng::seed_from_u64);
        Ok(Self { config, rng })
    }

    pub fn evaluate_all(&mut self, game: &Game) -> Vec<Evaluation> {
        let current = game.direction();
        let jobs: Vec<(Dir, u64)> = Dir::ALL
            .into_iter()
            .filter(|&d| d != current.opposite())
            .map(|d| (d, self.rng.r#gen()))
            .collect();
        let config = &self.config;
        jobs.into_par_iter()
            .map(|(dir, seed)| evaluate(game, dir, config, &mut SmallRng::seed_from_u64(seed)))
            .collect()
    }

    pub fn choose(&mut self, game: &Game) -> Dir {
        let mut best: Option<Evaluation> = None;
        for eval in self.evaluate_all(game) {
            if best.is_none_or(|b| eval.value() > b.value()) {
                best = Some(eval);
            }
        }
        best.map_or(game.direction(), |e| e.dir)
    }
}
