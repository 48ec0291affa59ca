//! Integer grid geometry shared by every generation stage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

/// A cell coordinate in map space.
///
/// Ordering is by `x` then `y`, which gives the ordered layout sets a stable
/// iteration order and the tunnel dedup key its "smaller endpoint first" rule.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

pub const UP: GridPos = GridPos::new(0, 1);
pub const DOWN: GridPos = GridPos::new(0, -1);
pub const LEFT: GridPos = GridPos::new(-1, 0);
pub const RIGHT: GridPos = GridPos::new(1, 0);

/// 4-neighbourhood, used for door detection.
pub const CARDINAL_DIRECTIONS: [GridPos; 4] = [UP, DOWN, LEFT, RIGHT];

/// 8-neighbourhood, used for walls and branch directions.
pub const ALL_DIRECTIONS: [GridPos; 8] = [
    UP,
    DOWN,
    LEFT,
    RIGHT,
    GridPos::new(1, 1),
    GridPos::new(1, -1),
    GridPos::new(-1, 1),
    GridPos::new(-1, -1),
];

impl GridPos {
    pub const ZERO: GridPos = GridPos::new(0, 0);

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Exact squared Euclidean distance. Every threshold check in the
    /// generator compares against a squared integer radius.
    pub fn distance_squared(self, other: GridPos) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    pub fn distance(self, other: GridPos) -> f32 {
        (self.distance_squared(other) as f64).sqrt() as f32
    }

    /// True when `other` lies strictly closer than `radius`.
    pub fn is_within(self, other: GridPos, radius: i32) -> bool {
        let r = radius.max(0) as i64;
        self.distance_squared(other) < r * r
    }

    /// Largest per-axis offset: the square ring `other` sits on around `self`.
    pub fn chebyshev_distance(self, other: GridPos) -> i64 {
        let dx = (self.x as i64 - other.x as i64).abs();
        let dy = (self.y as i64 - other.y as i64).abs();
        dx.max(dy)
    }

    /// Single greedy step toward `target` along the axis with the larger
    /// remaining distance (ties go to the y axis). Zero when already there.
    pub fn direction_to(self, target: GridPos) -> GridPos {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        if dx == 0 && dy == 0 {
            return GridPos::ZERO;
        }
        if dx.abs() > dy.abs() {
            GridPos::new(dx.signum(), 0)
        } else {
            GridPos::new(0, dy.signum())
        }
    }

    /// Moves one cell along x toward `target_x`.
    pub fn step_x_toward(self, target_x: i32) -> GridPos {
        GridPos::new(self.x + (target_x - self.x).signum(), self.y)
    }

    /// Moves one cell along y toward `target_y`.
    pub fn step_y_toward(self, target_y: i32) -> GridPos {
        GridPos::new(self.x, self.y + (target_y - self.y).signum())
    }

    pub fn is_diagonal(self) -> bool {
        self.x != 0 && self.y != 0
    }
}

impl Add for GridPos {
    type Output = GridPos;

    fn add(self, rhs: GridPos) -> GridPos {
        GridPos::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for GridPos {
    fn add_assign(&mut self, rhs: GridPos) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for GridPos {
    type Output = GridPos;

    fn sub(self, rhs: GridPos) -> GridPos {
        GridPos::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<i32> for GridPos {
    type Output = GridPos;

    fn mul(self, rhs: i32) -> GridPos {
        GridPos::new(self.x * rhs, self.y * rhs)
    }
}

impl From<(i32, i32)> for GridPos {
    fn from((x, y): (i32, i32)) -> Self {
        GridPos::new(x, y)
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
