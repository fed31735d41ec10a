//! Machine geometry and the value types shared by every kinematics routine.
//!
//! Towers sit on the corners of an equilateral triangle at a distance `r`
//! from the center of the build area, measured clockwise from the +y axis:
//!
//! ```text
//!          A            A = (0, r)
//!         / \           B = ( sqrt(3)/2 r, -r/2)
//!        /   \          C = (-sqrt(3)/2 r, -r/2)
//!       /  .  \
//!      /       \
//!     C---------B
//! ```
//!
//! Each carriage is joined to the effector by a rod of length `L`, so the
//! carriage height `D` of a tower at `(tx, ty)` satisfies
//! `(D - z)^2 + (x - tx)^2 + (y - ty)^2 = L^2`.

use core::{
    fmt,
    ops::{Add, Index, IndexMut, Mul, Sub},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const HALF_SQRT_3: f64 = 0.866_025_403_784_438_6;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeometryError {
    #[error("{name} must be a positive, finite length (got {value})")]
    NonPositive { name: &'static str, value: f64 },
    #[error("rod length {rod_length} must exceed the tower radius {radius}")]
    RodTooShort { radius: f64, rod_length: f64 },
    #[error("highest reachable z {max_z} is not above the minimum z {min_z}")]
    EmptyEnvelope { max_z: f64, min_z: f64 },
}

/// Immutable dimensions of a linear delta machine.
///
/// Construct once from configuration and share by reference; nothing in the
/// crate mutates it after [`DeltaGeometry::new`] validates it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaGeometry {
    radius: f64,
    rod_length: f64,
    rod_length2: f64,
}

impl DeltaGeometry {
    pub fn new(radius: f64, rod_length: f64) -> Result<Self, GeometryError> {
        check_length("radius", radius)?;
        check_length("rod_length", rod_length)?;
        if rod_length <= radius {
            return Err(GeometryError::RodTooShort { radius, rod_length });
        }
        Ok(Self {
            radius,
            rod_length,
            rod_length2: rod_length * rod_length,
        })
    }

    /// Distance from the center of the build area to each tower (`r`).
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Length of the rods linking carriages to the effector (`L`).
    pub fn rod_length(&self) -> f64 {
        self.rod_length
    }

    pub(crate) fn rod_length2(&self) -> f64 {
        self.rod_length2
    }

    /// Vertical distance between a carriage and the effector when the effector
    /// sits on the center axis: `sqrt(L^2 - r^2)`.
    pub fn center_drop(&self) -> f64 {
        (self.rod_length2 - self.radius * self.radius).sqrt()
    }

    /// Horizontal position of a tower's rail.
    pub fn tower_xy(&self, tower: Tower) -> (f64, f64) {
        let r = self.radius;
        match tower {
            Tower::A => (0.0, r),
            Tower::B => (HALF_SQRT_3 * r, -0.5 * r),
            Tower::C => (-HALF_SQRT_3 * r, -0.5 * r),
        }
    }
}

pub(crate) fn check_length(name: &'static str, value: f64) -> Result<(), GeometryError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::NonPositive { name, value })
    }
}

/// One of the three towers, also used as the axis index of a carriage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tower {
    A,
    B,
    C,
}

impl Tower {
    pub const ALL: [Tower; 3] = [Tower::A, Tower::B, Tower::C];

    /// Parse a tower from its letter (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "a" => Some(Tower::A),
            "b" => Some(Tower::B),
            "c" => Some(Tower::C),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Angle of the tower, clockwise from +y, in radians.
    pub fn angle(self) -> f64 {
        self.index() as f64 * 2.0 * core::f64::consts::FRAC_PI_3
    }
}

impl fmt::Display for Tower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tower::A => "A",
            Tower::B => "B",
            Tower::C => "C",
        };
        f.write_str(name)
    }
}

/// Small set of towers, used to report which rods failed to reach a point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TowerSet(u8);

impl TowerSet {
    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn with(mut self, tower: Tower) -> Self {
        self.0 |= 1 << tower as u8;
        self
    }

    pub const fn contains(&self, tower: Tower) -> bool {
        self.0 & (1 << tower as u8) != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Tower> {
        Tower::ALL.into_iter().filter(move |t| self.contains(*t))
    }
}

impl fmt::Display for TowerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tower) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{tower}")?;
        }
        Ok(())
    }
}

/// Cartesian coordinate, also used for velocity vectors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coord {
    pub const ZERO: Coord = Coord::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Coord) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Coord) -> Coord {
        Coord {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn norm_sq(self) -> f64 {
        self.dot(self)
    }

    pub fn norm(self) -> f64 {
        self.norm_sq().sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Largest per-component distance to `other`.
    pub fn max_abs_diff(self, other: Coord) -> f64 {
        (self.x - other.x)
            .abs()
            .max((self.y - other.y).abs())
            .max((self.z - other.z).abs())
    }
}

impl Add for Coord {
    type Output = Coord;

    fn add(self, rhs: Coord) -> Coord {
        Coord::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Coord {
    type Output = Coord;

    fn sub(self, rhs: Coord) -> Coord {
        Coord::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Coord {
    type Output = Coord;

    fn mul(self, rhs: f64) -> Coord {
        Coord::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6}, {:.6})", self.x, self.y, self.z)
    }
}

/// Carriage heights of the three towers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TowerHeights {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl TowerHeights {
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Heights with every carriage at `h`.
    pub const fn level(h: f64) -> Self {
        Self::new(h, h, h)
    }

    pub fn min(&self) -> f64 {
        self.a.min(self.b).min(self.c)
    }

    pub fn is_finite(&self) -> bool {
        self.a.is_finite() && self.b.is_finite() && self.c.is_finite()
    }
}

impl Index<Tower> for TowerHeights {
    type Output = f64;

    fn index(&self, tower: Tower) -> &f64 {
        match tower {
            Tower::A => &self.a,
            Tower::B => &self.b,
            Tower::C => &self.c,
        }
    }
}

impl IndexMut<Tower> for TowerHeights {
    fn index_mut(&mut self, tower: Tower) -> &mut f64 {
        match tower {
            Tower::A => &mut self.a,
            Tower::B => &mut self.b,
            Tower::C => &mut self.c,
        }
    }
}

impl fmt::Display for TowerHeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A={:.6} B={:.6} C={:.6}", self.a, self.b, self.c)
    }
}

/// Instantaneous effector state: position plus a constant velocity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    pub position: Coord,
    pub velocity: Coord,
}

impl MotionState {
    pub const fn new(position: Coord, velocity: Coord) -> Self {
        Self { position, velocity }
    }

    /// Position after `time` seconds of straight-line travel.
    pub fn at(&self, time: f64) -> Coord {
        self.position + self.velocity * time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rejects_invalid_dimensions() {
        assert!(matches!(
            DeltaGeometry::new(0.0, 260.0),
            Err(GeometryError::NonPositive { name: "radius", .. })
        ));
        assert!(matches!(
            DeltaGeometry::new(100.0, f64::NAN),
            Err(GeometryError::NonPositive {
                name: "rod_length",
                ..
            })
        ));
        assert!(matches!(
            DeltaGeometry::new(100.0, 100.0),
            Err(GeometryError::RodTooShort { .. })
        ));
    }

    #[test]
    fn towers_are_equidistant_from_center() {
        let geometry = DeltaGeometry::new(100.0, 260.0).unwrap();
        for tower in Tower::ALL {
            let (x, y) = geometry.tower_xy(tower);
            assert_relative_eq!(x.hypot(y), 100.0, epsilon = 1e-12);
            assert_relative_eq!(x, 100.0 * tower.angle().sin(), epsilon = 1e-12);
            assert_relative_eq!(y, 100.0 * tower.angle().cos(), epsilon = 1e-12);
        }
    }

    #[test]
    fn center_drop() {
        let geometry = DeltaGeometry::new(100.0, 260.0).unwrap();
        assert_eq!(geometry.center_drop(), 240.0);
    }

    #[test]
    fn tower_parse() {
        assert_eq!(Tower::parse("a"), Some(Tower::A));
        assert_eq!(Tower::parse("B"), Some(Tower::B));
        assert_eq!(Tower::parse("c"), Some(Tower::C));
        assert_eq!(Tower::parse("e"), None);
    }

    #[test]
    fn tower_set_display() {
        let set = TowerSet::new().with(Tower::C).with(Tower::A);
        assert_eq!(set.len(), 2);
        assert!(!set.contains(Tower::B));
        assert_eq!(set.to_string(), "A, C");
        assert!(TowerSet::new().is_empty());
    }

    #[test]
    fn heights_index_by_tower() {
        let mut heights = TowerHeights::new(1.0, 2.0, 3.0);
        heights[Tower::B] = 5.0;
        assert_eq!(heights[Tower::A], 1.0);
        assert_eq!(heights[Tower::B], 5.0);
        assert_eq!(heights.min(), 1.0);
    }
}
