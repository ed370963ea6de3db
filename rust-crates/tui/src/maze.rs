use cheddar_maze::{
    SeedId,
    engine::{
        Direction,
        EngineStatus,
        GameEngine,
        TouchDrag,
    },
};
use rand::{
    Rng,
    SeedableRng,
    rngs::StdRng,
    seq::SliceRandom,
};
use std::time::Duration;

pub const GAME_DURATION: Duration = Duration::from_secs(120);
pub const MAZE_WIDTH: usize = 21;
pub const MAZE_HEIGHT: usize = 13;
pub const CHEESE_COUNT: usize = 10;
pub const CHEESE_POINTS: u64 = 10;
pub const START: (usize, usize) = (1, 1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tile {
    Wall,
    Floor,
    Cheese,
    Exit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Maze {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl Maze {
    /// Carves a perfect maze with a randomized depth-first walk. Dimensions
    /// are rounded up to odd numbers so walls and passages alternate.
    pub fn generate(width: usize, height: usize, seed: u64) -> Self {
        let width = (width.max(5)) | 1;
        let height = (height.max(5)) | 1;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut maze = Self {
            width,
            height,
            tiles: vec![Tile::Wall; width * height],
        };

        maze.set(START, Tile::Floor);
        let mut stack = vec![START];
        while let Some(&(x, y)) = stack.last() {
            let options: Vec<_> = [(0isize, -2isize), (0, 2), (-2, 0), (2, 0)]
                .into_iter()
                .filter_map(|(dx, dy)| {
                    let nx = x.checked_add_signed(dx)?;
                    let ny = y.checked_add_signed(dy)?;
                    let inside = nx >= 1 && ny >= 1 && nx < width - 1 && ny < height - 1;
                    (inside && maze.tile(nx, ny) == Tile::Wall).then_some((nx, ny))
                })
                .collect();
            if options.is_empty() {
                stack.pop();
                continue;
            }
            let (nx, ny) = options[rng.random_range(0..options.len())];
            maze.set(((x + nx) / 2, (y + ny) / 2), Tile::Floor);
            maze.set((nx, ny), Tile::Floor);
            stack.push((nx, ny));
        }

        let exit = (width - 2, height - 2);
        maze.set(exit, Tile::Exit);

        let mut floors: Vec<_> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .filter(|&pos| pos != START && maze.tile(pos.0, pos.1) == Tile::Floor)
            .collect();
        floors.shuffle(&mut rng);
        for pos in floors.into_iter().take(CHEESE_COUNT) {
            maze.set(pos, Tile::Cheese);
        }
        maze
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tile(&self, x: usize, y: usize) -> Tile {
        if x >= self.width || y >= self.height {
            return Tile::Wall;
        }
        self.tiles[y * self.width + x]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Tile]> {
        self.tiles.chunks(self.width)
    }

    pub fn cheese_left(&self) -> usize {
        self.tiles.iter().filter(|t| **t == Tile::Cheese).count()
    }

    fn set(&mut self, (x, y): (usize, usize), tile: Tile) {
        self.tiles[y * self.width + x] = tile;
    }
}

/// Turns a backend seed id into a generator seed. Numeric ids are used as-is,
/// anything else is folded with FNV-1a.
pub fn seed_value(seed: &SeedId) -> u64 {
    let raw = seed.as_str();
    if let Ok(value) = raw.parse::<u64>() {
        return value;
    }
    raw.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[derive(Clone, Debug)]
pub struct MazeGame {
    seed: u64,
    maze: Maze,
    player: (usize, usize),
    score: u64,
    remaining: Duration,
    timer_started: bool,
    game_over: bool,
    game_over_message: String,
    power_up_on: bool,
}

impl MazeGame {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            maze: Maze::generate(MAZE_WIDTH, MAZE_HEIGHT, seed),
            player: START,
            score: 0,
            remaining: GAME_DURATION,
            timer_started: false,
            game_over: false,
            game_over_message: String::new(),
            power_up_on: false,
        }
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn player(&self) -> (usize, usize) {
        self.player
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Seed for the next game. The board is regenerated right away unless a
    /// game is running.
    pub fn load_seed(&mut self, seed: &SeedId) {
        self.seed = seed_value(seed);
        tracing::debug!(seed = self.seed, "maze seed loaded");
        if !self.timer_started && !self.game_over {
            self.maze = Maze::generate(MAZE_WIDTH, MAZE_HEIGHT, self.seed);
            self.player = START;
        }
    }

    /// Advances the countdown; returns true when this tick ended the game.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        if !self.timer_started {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(elapsed);
        if self.remaining.is_zero() {
            let message = format!("Time's up! You collected {} points.", self.score);
            self.end(message);
            return true;
        }
        false
    }

    fn end(&mut self, message: String) {
        tracing::info!(score = self.score, %message, "game over");
        self.timer_started = false;
        self.game_over = true;
        self.game_over_message = message;
    }
}

impl GameEngine for MazeGame {
    fn status(&self) -> EngineStatus {
        EngineStatus {
            score: self.score,
            game_over: self.game_over,
            game_over_message: self.game_over_message.clone(),
            timer_started: self.timer_started,
            remaining: self.remaining,
            power_up_on: self.power_up_on,
        }
    }

    fn handle_key_press(&mut self, direction: Direction) {
        if !self.timer_started {
            return;
        }
        let (x, y) = self.player;
        let target = match direction {
            Direction::Up => (x, y.saturating_sub(1)),
            Direction::Down => (x, y + 1),
            Direction::Left => (x.saturating_sub(1), y),
            Direction::Right => (x + 1, y),
        };
        match self.maze.tile(target.0, target.1) {
            Tile::Wall => {}
            Tile::Floor => self.player = target,
            Tile::Cheese => {
                self.player = target;
                let multiplier = if self.power_up_on { 2 } else { 1 };
                self.score += CHEESE_POINTS * multiplier;
                self.maze.set(target, Tile::Floor);
            }
            Tile::Exit => {
                self.player = target;
                let message = format!("You escaped the maze with {} points!", self.score);
                self.end(message);
            }
        }
    }

    fn handle_touch_move(&mut self, drag: TouchDrag) {
        if let Some(direction) = drag.dominant_direction() {
            self.handle_key_press(direction);
        }
    }

    fn restart_game(&mut self) {
        self.maze = Maze::generate(MAZE_WIDTH, MAZE_HEIGHT, self.seed);
        self.player = START;
        self.score = 0;
        self.remaining = GAME_DURATION;
        self.timer_started = true;
        self.game_over = false;
        self.game_over_message.clear();
    }

    fn toggle_power_up(&mut self) {
        self.power_up_on = !self.power_up_on;
    }
}
