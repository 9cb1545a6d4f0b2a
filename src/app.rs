//! Windowed front end. A [`Driver`] owns whatever advances the game; the
//! event loop only forwards input, ticks it, and paints its snapshot.

use crate::game::{Dir, Game};
use crate::pilot::Pilot;
use crate::render::{self, frame_size};
use crate::trainer::Trainer;
use anyhow::{Result, anyhow};
use pixels::{Pixels, SurfaceTexture};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::event::{Event, VirtualKeyCode};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;
use winit_input_helper::WinitInputHelper;

pub trait Driver: 'static {
    fn title(&self) -> String;
    fn game(&self) -> &Game;
    fn hud(&self) -> Vec<String>;
    fn tick(&mut self);
    fn input(&mut self, _input: &WinitInputHelper) {}
    /// Closes the window once true.
    fn finished(&self) -> bool {
        false
    }
    /// Runs once when the event loop goes down, however it was closed.
    fn shutdown(&mut self) {}
}

/// Opens a window sized to the driver's grid and runs until Esc, Q, close,
/// or [`Driver::finished`]. Does not return once the loop starts.
pub fn run<D: Driver>(mut driver: D, tick: Duration) -> Result<()> {
    let event_loop = EventLoop::new();
    let mut input = WinitInputHelper::new();
    let (width, height) = {
        let cfg = driver.game().config();
        frame_size(cfg.width, cfg.height)
    };

    let window = WindowBuilder::new()
        .with_title(driver.title())
        .with_inner_size(LogicalSize::new(width, height))
        .with_resizable(false)
        .build(&event_loop)
        .map_err(|e| anyhow!("failed to open window: {e}"))?;

    let mut pixels = {
        let window_size = window.inner_size();
        let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
        Pixels::new(width, height, surface_texture)
            .map_err(|e| anyhow!("failed to create pixel surface: {e}"))?
    };

    let mut last_tick = Instant::now();

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        if let Event::RedrawRequested(_) = event {
            render::draw(pixels.frame_mut(), &driver.game().snapshot(), &driver.hud());
            if let Err(e) = pixels.render() {
                error!(error = %e, "render failed");
                *control_flow = ControlFlow::Exit;
                return;
            }
        }

        if let Event::LoopDestroyed = event {
            driver.shutdown();
            return;
        }

        if input.update(&event) {
            if input.key_pressed(VirtualKeyCode::Escape)
                || input.key_pressed(VirtualKeyCode::Q)
                || input.close_requested()
                || input.destroyed()
            {
                *control_flow = ControlFlow::Exit;
                return;
            }

            driver.input(&input);
            if last_tick.elapsed() >= tick {
                driver.tick();
                last_tick = Instant::now();
            }
            if driver.finished() {
                *control_flow = ControlFlow::Exit;
                return;
            }
            window.request_redraw();
        }
    })
}

/// Keyboard play: arrows or WASD steer, R restarts.
pub struct ManualDriver {
    game: Game,
}

impl ManualDriver {
    pub fn new(game: Game) -> Self {
        Self { game }
    }
}

impl Driver for ManualDriver {
    fn title(&self) -> String {
        "Snake".to_string()
    }

    fn game(&self) -> &Game {
        &self.game
    }

    fn hud(&self) -> Vec<String> {
        let mut lines = vec![
            format!("SCORE: {}", self.game.score()),
            format!("LENGTH: {}", self.game.len()),
        ];
        if self.game.is_terminal() {
            lines.push("R RESTART - Q QUIT".to_string());
        }
        lines
    }

    fn tick(&mut self) {
        self.game.step();
    }

    fn input(&mut self, input: &WinitInputHelper) {
        let keys = [
            (VirtualKeyCode::Up, VirtualKeyCode::W, Dir::Up),
            (VirtualKeyCode::Down, VirtualKeyCode::S, Dir::Down),
            (VirtualKeyCode::Left, VirtualKeyCode::A, Dir::Left),
            (VirtualKeyCode::Right, VirtualKeyCode::D, Dir::Right),
        ];
        for (arrow, letter, dir) in keys {
            if input.key_pressed(arrow) || input.key_pressed(letter) {
                self.game.set_direction(dir);
            }
        }
        if input.key_pressed(VirtualKeyCode::R) {
            self.game.reset();
        }
    }
}

/// Plays `games` rounds with a [`Pilot`], lingering on each finished board.
/// A round also ends after `max_steps` moves, as in [`crate::pilot::play`].
pub struct AutoDriver {
    game: Game,
    pilot: Pilot,
    games: usize,
    max_steps: usize,
    steps: usize,
    played: usize,
    total_score: usize,
    linger: u32,
}

const LINGER_TICKS: u32 = 20;

impl AutoDriver {
    pub fn new(game: Game, pilot: Pilot, games: usize, max_steps: usize) -> Self {
        Self {
            game,
            pilot,
            games,
            max_steps: max_steps.max(1),
            steps: 0,
            played: 0,
            total_score: 0,
            linger: 0,
        }
    }

    fn round_over(&self) -> bool {
        self.game.is_terminal() || self.steps >= self.max_steps
    }

    fn end_round(&mut self) {
        self.played += 1;
        self.total_score += self.game.score();
        self.linger = LINGER_TICKS;
    }
}

impl Driver for AutoDriver {
    fn title(&self) -> String {
        match self.pilot {
            Pilot::Greedy(_) => "Snake - Q-learning agent".to_string(),
            Pilot::Lookahead(_) => "Snake - lookahead bot".to_string(),
        }
    }

    fn game(&self) -> &Game {
        &self.game
    }

    fn hud(&self) -> Vec<String> {
        let avg = if self.played > 0 { self.total_score as f64 / self.played as f64 } else { 0.0 };
        vec![
            format!("SCORE: {}", self.game.score()),
            format!("GAME: {}/{}", (self.played + 1).min(self.games), self.games),
            format!("AVG: {avg:.1}"),
        ]
    }

    fn tick(&mut self) {
        if !self.round_over() {
            let dir = self.pilot.choose(&self.game);
            self.game.set_direction(dir);
            self.game.step();
            self.steps += 1;
            if let Some(reason) = self.game.outcome() {
                self.end_round();
                info!(game = self.played, score = self.game.score(), %reason, "game over");
            } else if self.steps >= self.max_steps {
                self.end_round();
                warn!(game = self.played, score = self.game.score(), steps = self.steps, "step cap reached");
            }
        } else if self.linger > 0 {
            self.linger -= 1;
        } else if self.played < self.games {
            self.game.reset();
            self.steps = 0;
        }
    }

    fn finished(&self) -> bool {
        self.played >= self.games && self.linger == 0
    }
}

/// Live training view. `+`/`-` change how many steps run per frame; the
/// table is saved when the window goes down, finished or not.
pub struct TrainingDriver {
    trainer: Trainer,
    table_path: PathBuf,
    steps_per_frame: u32,
    best_score: usize,
    last_score: usize,
}

impl TrainingDriver {
    pub fn new(trainer: Trainer, table_path: PathBuf) -> Self {
        Self { trainer, table_path, steps_per_frame: 1, best_score: 0, last_score: 0 }
    }
}

impl Driver for TrainingDriver {
    fn title(&self) -> String {
        "Snake - training".to_string()
    }

    fn game(&self) -> &Game {
        self.trainer.game()
    }

    fn hud(&self) -> Vec<String> {
        vec![
            format!("EPISODE: {}/{}", self.trainer.episode(), self.trainer.config().episodes),
            format!("EPSILON: {:.3}", self.trainer.epsilon()),
            format!("LAST: {}  BEST: {}", self.last_score, self.best_score),
            format!("STATES: {}", self.trainer.table().len()),
            format!("STEPS/FRAME: {}", self.steps_per_frame),
        ]
    }

    fn tick(&mut self) {
        for _ in 0..self.steps_per_frame {
            if self.finished() {
                break;
            }
            if let (_, Some(summary)) = self.trainer.step() {
                self.last_score = summary.score;
                self.best_score = self.best_score.max(summary.score);
            }
        }
    }

    fn input(&mut self, input: &WinitInputHelper) {
        if input.key_pressed(VirtualKeyCode::NumpadAdd) || input.key_pressed(VirtualKeyCode::Equals) {
            self.steps_per_frame = self.steps_per_frame.saturating_mul(2).min(10_000);
        }
        if input.key_pressed(VirtualKeyCode::NumpadSubtract) || input.key_pressed(VirtualKeyCode::Minus) {
            self.steps_per_frame = (self.steps_per_frame / 2).max(1);
        }
    }

    fn finished(&self) -> bool {
        self.trainer.episode() >= self.trainer.config().episodes
    }

    fn shutdown(&mut self) {
        if !self.finished() {
            self.trainer.abandon_episode();
            info!(completed = self.trainer.episode(), "training interrupted");
        }
        if let Err(e) = self.trainer.table().persist(&self.table_path) {
            error!(error = %format!("{e:#}"), "failed to save value table");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameConfig;
    use crate::lookahead::{LookaheadBot, LookaheadConfig};
    use crate::qtable::QTable;

    fn calm() -> Game {
        Game::seeded(GameConfig::new(12, 12, 0.0, 0).unwrap(), 21).unwrap()
    }

    #[test]
    fn autoplay_round_ends_at_the_step_cap() {
        let bot = LookaheadBot::new(LookaheadConfig::default(), Some(8)).unwrap();
        let mut driver = AutoDriver::new(calm(), Pilot::Lookahead(bot), 1, 3);
        for _ in 0..3 {
            driver.tick();
        }
        assert_eq!(driver.played, 1);
        assert!(!driver.game().is_terminal());
        assert!(!driver.finished());

        for _ in 0..LINGER_TICKS {
            driver.tick();
        }
        assert!(driver.finished());
    }

    #[test]
    fn autoplay_resets_between_rounds() {
        // An empty table steers straight up into the wall after seven moves.
        let mut driver = AutoDriver::new(calm(), Pilot::Greedy(QTable::new()), 2, 1_000);
        for _ in 0..7 {
            driver.tick();
        }
        assert_eq!(driver.played, 1);
        assert!(driver.game().is_terminal());

        for _ in 0..=LINGER_TICKS {
            driver.tick();
        }
        assert!(!driver.game().is_terminal());
        assert_eq!(driver.steps, 0);
        assert!(!driver.finished());
    }
}
