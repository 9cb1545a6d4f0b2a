use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use snake_qlearn::app::{self, AutoDriver, ManualDriver, TrainingDriver};
use snake_qlearn::lookahead::LookaheadBot;
use snake_qlearn::pilot::{self, Pilot};
use snake_qlearn::{Config, Game, GameConfig, QTable, Trainer};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snake-qlearn")]
#[command(version, about = "Snake with a tabular Q-learning agent")]
struct Cli {
    /// JSON config file; flags below override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Value table location
    #[arg(long, global = true)]
    table: Option<PathBuf>,

    /// Seed for every random decision
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Grid width
    #[arg(long, global = true)]
    width: Option<i32>,

    /// Grid height
    #[arg(long, global = true)]
    height: Option<i32>,

    /// Chance of a new hazard after each move
    #[arg(long, global = true)]
    hazard_probability: Option<f64>,

    /// Hazard cap
    #[arg(long, global = true)]
    max_hazards: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train the Q-learning agent and save its table
    Train {
        #[arg(long)]
        episodes: Option<usize>,
        #[arg(long)]
        learning_rate: Option<f32>,
        #[arg(long)]
        discount: Option<f32>,
        #[arg(long)]
        epsilon_start: Option<f32>,
        #[arg(long)]
        epsilon_decay: Option<f32>,
        #[arg(long)]
        epsilon_min: Option<f32>,
        /// Watch training live; closing the window saves progress
        #[arg(long)]
        render: bool,
    },
    /// Let the trained agent play greedily
    Play {
        #[arg(long, default_value = "3")]
        games: usize,
        #[arg(long, default_value = "10000")]
        max_steps: usize,
        #[arg(long)]
        render: bool,
    },
    /// Let the Monte-Carlo lookahead bot play
    Futures {
        #[arg(long, default_value = "3")]
        games: usize,
        #[arg(long)]
        rollouts: Option<usize>,
        #[arg(long)]
        depth: Option<usize>,
        #[arg(long, default_value = "10000")]
        max_steps: usize,
        #[arg(long)]
        render: bool,
    },
    /// Play with the keyboard
    Manual,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };
        if let Some(table) = &self.table {
            config.table_path = table.clone();
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        let game = &mut config.game;
        if let Some(v) = self.width {
            game.width = v;
        }
        if let Some(v) = self.height {
            game.height = v;
        }
        if let Some(v) = self.hazard_probability {
            game.hazard_spawn_probability = v;
        }
        if let Some(v) = self.max_hazards {
            game.max_hazards = v;
        }

        match self.command {
            Command::Train {
                episodes,
                learning_rate,
                discount,
                epsilon_start,
                epsilon_decay,
                epsilon_min,
                ..
            } => {
                let t = &mut config.training;
                t.episodes = episodes.unwrap_or(t.episodes);
                t.learning_rate = learning_rate.unwrap_or(t.learning_rate);
                t.discount = discount.unwrap_or(t.discount);
                t.epsilon_start = epsilon_start.unwrap_or(t.epsilon_start);
                t.epsilon_decay = epsilon_decay.unwrap_or(t.epsilon_decay);
                t.epsilon_min = epsilon_min.unwrap_or(t.epsilon_min);
            }
            Command::Futures { rollouts, depth, .. } => {
                let l = &mut config.lookahead;
                l.rollouts = rollouts.unwrap_or(l.rollouts);
                l.depth = depth.unwrap_or(l.depth);
            }
            Command::Play { .. } | Command::Manual => {}
        }

        config.validate()?;
        Ok(config)
    }
}

fn new_game(config: GameConfig, seed: Option<u64>) -> Result<Game> {
    let game = match seed {
        Some(seed) => Game::seeded(config, seed)?,
        None => Game::new(config)?,
    };
    Ok(game)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    match cli.command {
        Command::Train { render, .. } => {
            let table = QTable::load(&config.table_path);
            let mut trainer = Trainer::new(config.game, config.training, table, config.seed)?;
            if render {
                return app::run(TrainingDriver::new(trainer, config.table_path), Duration::ZERO);
            }
            let stop = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&stop);
            ctrlc::set_handler(move || {
                warn!("interrupt received, finishing the current step");
                flag.store(true, Ordering::Relaxed);
            })
            .context("failed to install Ctrl-C handler")?;
            let report = trainer.run(&stop);
            info!(
                episodes = report.episodes,
                best_score = report.best_score,
                mean_score = report.mean_score,
                states = report.states,
                "training finished"
            );
            trainer.table().persist(&config.table_path)?;
        }
        Command::Play { games, max_steps, render } => {
            let table = QTable::load(&config.table_path);
            if table.is_empty() {
                warn!("value table is empty, the agent will play blind");
            }
            let mut game = new_game(config.game, config.seed)?;
            let mut agent = Pilot::Greedy(table);
            if render {
                return app::run(AutoDriver::new(game, agent, games, max_steps), Duration::from_millis(33));
            }
            pilot::play(&mut game, &mut agent, games, max_steps);
        }
        Command::Futures { games, max_steps, render, .. } => {
            let bot = LookaheadBot::new(config.lookahead, config.seed.map(|s| s.wrapping_add(1)))?;
            let mut game = new_game(config.game, config.seed)?;
            let mut bot = Pilot::Lookahead(bot);
            if render {
                return app::run(AutoDriver::new(game, bot, games, max_steps), Duration::from_millis(50));
            }
            pilot::play(&mut game, &mut bot, games, max_steps);
        }
        Command::Manual => {
            let game = new_game(config.game, config.seed)?;
            return app::run(ManualDriver::new(game), Duration::from_millis(100));
        }
    }
    Ok(())
}
