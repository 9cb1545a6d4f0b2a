use crate::error::ConfigError;
use ahash::AHashSet;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Cells behind the head in the starting layout.
const START_LEN: i32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dir: Dir) -> Self {
        let (dx, dy) = dir.offset();
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn manhattan(self, other: Pos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// Screen-space heading: `Up` decreases `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::Up, Dir::Down, Dir::Left, Dir::Right];

    pub fn offset(self) -> (i32, i32) {
        match self {
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }

    /// Heading after a quarter turn counter-clockwise.
    pub fn left(self) -> Dir {
        match self {
            Dir::Up => Dir::Left,
            Dir::Left => Dir::Down,
            Dir::Down => Dir::Right,
            Dir::Right => Dir::Up,
        }
    }

    /// Heading after a quarter turn clockwise.
    pub fn right(self) -> Dir {
        match self {
            Dir::Up => Dir::Right,
            Dir::Right => Dir::Down,
            Dir::Down => Dir::Left,
            Dir::Left => Dir::Up,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    Wall,
    SelfCollision,
    Hazard,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wall => write!(f, "hit the wall"),
            Self::SelfCollision => write!(f, "hit yourself"),
            Self::Hazard => write!(f, "hit a hazard"),
        }
    }
}

/// What a single call to [`Game::step`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// The game was already over; nothing changed.
    Idle,
    Moved,
    Ate,
    Ended(EndReason),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub width: i32,
    pub height: i32,
    pub hazard_spawn_probability: f64,
    pub max_hazards: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            hazard_spawn_probability: 0.08,
            max_hazards: 20,
        }
    }
}

impl GameConfig {
    pub fn new(
        width: i32,
        height: i32,
        hazard_spawn_probability: f64,
        max_hazards: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self { width, height, hazard_spawn_probability, max_hazards };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width <= 0 || self.height <= 0 {
            return Err(ConfigError::GridDimension { width: self.width, height: self.height });
        }
        // The tail starts two cells left of the centre column.
        let min = 2 * (START_LEN - 1);
        if self.width < min {
            return Err(ConfigError::GridTooSmall { width: self.width, min });
        }
        if !(0.0..=1.0).contains(&self.hazard_spawn_probability) {
            return Err(ConfigError::Probability {
                name: "hazard_spawn_probability",
                value: self.hazard_spawn_probability,
            });
        }
        Ok(())
    }

    pub fn contains(&self, p: Pos) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.width && p.y < self.height
    }
}

/// Read-only view of a [`Game`], handed to the encoder and the renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Snapshot<'a> {
    /// Head first.
    pub snake: &'a VecDeque<Pos>,
    pub direction: Dir,
    pub food: Option<Pos>,
    pub hazards: &'a AHashSet<Pos>,
    pub score: usize,
    pub outcome: Option<EndReason>,
    pub width: i32,
    pub height: i32,
}

impl Snapshot<'_> {
    pub fn head(&self) -> Pos {
        self.snake[0]
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn in_bounds(&self, p: Pos) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.width && p.y < self.height
    }
}

/// Snake on a bounded grid with food and randomly spawning hazards.
///
/// All randomness comes from the game's own generator, so a seeded game
/// replays identically and a [`fork`](Game::fork) continues the exact same
/// random stream until [`reseed`](Game::reseed) is called on it.
#[derive(Clone, Debug)]
pub struct Game {
    config: GameConfig,
    snake: VecDeque<Pos>,
    dir: Dir,
    pending: Dir,
    food: Option<Pos>,
    hazards: AHashSet<Pos>,
    score: usize,
    outcome: Option<EndReason>,
    rng: SmallRng,
}

impl Game {
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, SmallRng::from_entropy())
    }

    pub fn seeded(config: GameConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(config: GameConfig, rng: SmallRng) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut game = Self {
            config,
            snake: VecDeque::new(),
            dir: Dir::Right,
            pending: Dir::Right,
            food: None,
            hazards: AHashSet::new(),
            score: 0,
            outcome: None,
            rng,
        };
        game.reset();
        Ok(game)
    }

    /// Starts a fresh round on the same grid. The random stream carries on.
    pub fn reset(&mut self) {
        let start_x = self.config.width / 2;
        let start_y = self.config.height / 2;
        self.snake.clear();
        for i in 0..START_LEN {
            self.snake.push_back(Pos::new(start_x - i, start_y));
        }
        self.dir = Dir::Right;
        self.pending = Dir::Right;
        self.hazards.clear();
        self.score = 0;
        self.outcome = None;
        self.food = None;
        self.place_food();
    }

    /// Independent deep copy, including the random generator state.
    pub fn fork(&self) -> Game {
        self.clone()
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    /// Buffers `dir` for the next step. A reversal of the current heading is dropped.
    pub fn set_direction(&mut self, dir: Dir) {
        if dir != self.dir.opposite() {
            self.pending = dir;
        }
    }

    pub fn step(&mut self) -> Step {
        if self.outcome.is_some() {
            return Step::Idle;
        }
        self.dir = self.pending;
        let new_head = self.head().offset(self.dir);

        let hit = if !self.config.contains(new_head) {
            Some(EndReason::Wall)
        } else if self.snake.contains(&new_head) {
            Some(EndReason::SelfCollision)
        } else if self.hazards.contains(&new_head) {
            Some(EndReason::Hazard)
        } else {
            None
        };
        if let Some(reason) = hit {
            self.outcome = Some(reason);
            return Step::Ended(reason);
        }

        self.snake.push_front(new_head);
        let ate = self.food == Some(new_head);
        if ate {
            self.score += 1;
            self.food = None;
            self.place_food();
        } else {
            self.snake.pop_back();
        }
        self.try_spawn_hazard();

        if ate { Step::Ate } else { Step::Moved }
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            snake: &self.snake,
            direction: self.dir,
            food: self.food,
            hazards: &self.hazards,
            score: self.score,
            outcome: self.outcome,
            width: self.config.width,
            height: self.config.height,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn outcome(&self) -> Option<EndReason> {
        self.outcome
    }

    pub fn direction(&self) -> Dir {
        self.dir
    }

    pub fn head(&self) -> Pos {
        self.snake[0]
    }

    pub fn food(&self) -> Option<Pos> {
        self.food
    }

    pub fn len(&self) -> usize {
        self.snake.len()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Moves the food onto `pos` for scripted scenarios. Returns `false` and
    /// leaves the food alone if `pos` is off the grid or occupied.
    pub fn place_food_at(&mut self, pos: Pos) -> bool {
        if !self.is_free(pos) && self.food != Some(pos) {
            return false;
        }
        self.food = Some(pos);
        true
    }

    /// Drops a hazard onto `pos` for scripted scenarios, ignoring the cap.
    pub fn place_hazard_at(&mut self, pos: Pos) -> bool {
        if !self.is_free(pos) {
            return false;
        }
        self.hazards.insert(pos)
    }

    fn is_free(&self, p: Pos) -> bool {
        self.config.contains(p)
            && !self.snake.contains(&p)
            && self.food != Some(p)
            && !self.hazards.contains(&p)
    }

    // Column-major scan keeps the candidate order stable for seeded replays.
    fn empty_cells(&self) -> Vec<Pos> {
        let mut cells = Vec::new();
        for x in 0..self.config.width {
            for y in 0..self.config.height {
                let p = Pos::new(x, y);
                if self.is_free(p) {
                    cells.push(p);
                }
            }
        }
        cells
    }

    fn place_food(&mut self) {
        let cells = self.empty_cells();
        self.food = cells.choose(&mut self.rng).copied();
    }

    fn try_spawn_hazard(&mut self) {
        if self.hazards.len() >= self.config.max_hazards
            || !self.rng.gen_bool(self.config.hazard_spawn_probability)
        {
            return;
        }
        let cells = self.empty_cells();
        if let Some(&p) = cells.choose(&mut self.rng) {
            self.hazards.insert(p);
        }
    }
}
