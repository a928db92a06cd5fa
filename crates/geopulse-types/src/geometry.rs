//! Positions in globe space.
//!
//! The globe is centered at the origin with `+y` pointing at the north
//! pole. A unit globe has radius 1.0; markers sit slightly above it.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A point (or direction) in 3D globe space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position3D {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate (polar axis).
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Position3D {
    /// The origin (globe center).
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    /// Create a position from its components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance from the origin.
    pub fn length(self) -> f64 {
        self.z.mul_add(self.z, self.x.mul_add(self.x, self.y * self.y)).sqrt()
    }

    /// The unit vector pointing the same way, or the origin for a
    /// zero-length input.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            self.scaled(len.recip())
        } else {
            Self::ORIGIN
        }
    }

    /// Multiply every component by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// `self + direction * distance`.
    #[must_use]
    pub const fn offset_along(self, direction: Self, distance: f64) -> Self {
        Self::new(
            direction.x.mul_add(distance, self.x),
            direction.y.mul_add(distance, self.y),
            direction.z.mul_add(distance, self.z),
        )
    }

    /// Euclidean distance between two points.
    pub fn distance_to(self, other: Self) -> f64 {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z).length()
    }
}
