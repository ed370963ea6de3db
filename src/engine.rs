use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Pointer or touch drag, in board cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TouchDrag {
    pub dx: i32,
    pub dy: i32,
}

impl TouchDrag {
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Direction along the longer axis. Ties go to the horizontal axis.
    pub fn dominant_direction(&self) -> Option<Direction> {
        if self.dx == 0 && self.dy == 0 {
            return None;
        }
        let direction = if self.dx.abs() >= self.dy.abs() {
            if self.dx > 0 {
                Direction::Right
            } else {
                Direction::Left
            }
        } else if self.dy > 0 {
            Direction::Down
        } else {
            Direction::Up
        };
        Some(direction)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineStatus {
    pub score: u64,
    pub game_over: bool,
    pub game_over_message: String,
    pub timer_started: bool,
    pub remaining: Duration,
    pub power_up_on: bool,
}

/// The maze game itself. Handlers are invoked only after the gate allowed
/// the action.
pub trait GameEngine {
    fn status(&self) -> EngineStatus;

    fn handle_key_press(&mut self, direction: Direction);

    fn handle_touch_move(&mut self, drag: TouchDrag);

    fn restart_game(&mut self);

    fn toggle_power_up(&mut self);
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn dominant_direction__picks_longer_axis() {
        assert_eq!(Some(Direction::Right), TouchDrag::new(3, -1).dominant_direction());
        assert_eq!(Some(Direction::Up), TouchDrag::new(1, -4).dominant_direction());
        assert_eq!(Some(Direction::Down), TouchDrag::new(0, 2).dominant_direction());
        assert_eq!(Some(Direction::Left), TouchDrag::new(-2, 2).dominant_direction());
    }

    #[test]
    fn dominant_direction__zero_drag_has_none() {
        assert_eq!(None, TouchDrag::default().dominant_direction());
    }
}
