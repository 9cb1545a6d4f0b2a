use crate::features::encode;
use crate::game::{Dir, EndReason, Game};
use crate::lookahead::LookaheadBot;
use crate::policy::{action_dir, greedy};
use crate::qtable::QTable;
use tracing::{info, warn};

/// Who steers an autoplayed game. Neither variant learns.
pub enum Pilot {
    Greedy(QTable),
    Lookahead(LookaheadBot),
}

impl Pilot {
    pub fn choose(&mut self, game: &Game) -> Dir {
        match self {
            Pilot::Greedy(table) => action_dir(greedy(&table.get(encode(&game.snapshot())))),
            Pilot::Lookahead(bot) => bot.choose(game),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GameResult {
    pub score: usize,
    pub steps: usize,
    /// `None` if the step cap ended the game.
    pub reason: Option<EndReason>,
}

/// Plays `games` rounds on `game`, resetting between them. A greedy table
/// can steer into an endless loop, so each round stops after `max_steps`.
pub fn play(game: &mut Game, pilot: &mut Pilot, games: usize, max_steps: usize) -> Vec<GameResult> {
    let mut results = Vec::with_capacity(games);
    for round in 0..games {
        game.reset();
        let mut steps = 0;
        while !game.is_terminal() && steps < max_steps {
            let dir = pilot.choose(game);
            game.set_direction(dir);
            game.step();
            steps += 1;
        }
        let result = GameResult { score: game.score(), steps, reason: game.outcome() };
        match result.reason {
            Some(reason) => info!(game = round + 1, score = result.score, steps, %reason, "game over"),
            None => warn!(game = round + 1, score = result.score, steps, "step cap reached"),
        }
        results.push(result);
    }
    if !results.is_empty() {
        let avg = results.iter().map(|r| r.score).sum::<usize>() as f64 / results.len() as f64;
        info!(games = results.len(), avg_score = avg, "evaluation finished");
    }
    results
}
