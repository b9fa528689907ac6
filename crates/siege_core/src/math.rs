//! Fixed-point math utilities for deterministic simulation.
//!
//! Every distance, range, speed and sub-tile offset in combat resolution is a
//! [`Fixed`]. Catalog files carry plain decimals which are converted exactly
//! once, at load time, through [`fixed_decimal`].

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// √2 truncated to 32 fractional bits. Cost of a diagonal step.
pub const SQRT_2: Fixed = Fixed::from_bits(0x1_6A09_E667);

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for human-edited decimal values.
///
/// Human-readable formats (catalog RON, JSON reports) write `range: 3.5`
/// rather than raw bits. Binary formats keep the raw bits so snapshots stay
/// exact. The decimal conversion happens once while loading, so the
/// simulation itself never touches floats.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal or raw bits.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_f64(value.to_num::<f64>())
        } else {
            value.to_bits().serialize(serializer)
        }
    }

    /// Deserialize a fixed-point number from a decimal or raw bits.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let value = f64::deserialize(deserializer)?;
            Fixed::checked_from_num(value)
                .ok_or_else(|| D::Error::custom(format!("{value} is not representable")))
        } else {
            i64::deserialize(deserializer).map(Fixed::from_bits)
        }
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..48 {
        let mid = (low + high) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Octile distance between two integer grid points, D = 1, D2 = √2.
///
/// Never overestimates the cost of an 8-connected walk, so it is an
/// admissible A* heuristic.
#[must_use]
pub fn octile_distance(dx: u32, dy: u32) -> Fixed {
    let (long, short) = if dx >= dy { (dx, dy) } else { (dy, dx) };
    Fixed::from_num(long) + (SQRT_2 - Fixed::ONE) * Fixed::from_num(short)
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_distance_squared() {
        let a = Vec2Fixed::new(Fixed::from_num(3), Fixed::from_num(0));
        let b = Vec2Fixed::new(Fixed::from_num(0), Fixed::from_num(4));
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
    }

    #[test]
    fn test_vec2_lerp() {
        let a = Vec2Fixed::ZERO;
        let b = Vec2Fixed::new(Fixed::from_num(10), Fixed::from_num(20));
        let mid = a.lerp(b, Fixed::from_num(0.5));
        assert_eq!(mid, Vec2Fixed::new(Fixed::from_num(5), Fixed::from_num(10)));
    }

    #[test]
    fn test_sqrt_2_constant() {
        let squared = SQRT_2 * SQRT_2;
        let two = Fixed::from_num(2);
        assert!(squared <= two);
        assert!(two - squared < Fixed::from_num(0.000_001));
    }

    #[test]
    fn test_fixed_sqrt() {
        assert_eq!(fixed_sqrt(Fixed::from_num(16)), Fixed::from_num(4));
        assert_eq!(fixed_sqrt(Fixed::ZERO), Fixed::ZERO);
        let root = fixed_sqrt(Fixed::from_num(2));
        assert!((root - SQRT_2).abs() < Fixed::from_num(0.000_001));
    }

    #[test]
    fn test_octile_distance() {
        assert_eq!(octile_distance(5, 0), Fixed::from_num(5));
        assert_eq!(octile_distance(0, 0), Fixed::ZERO);
        // 3 diagonal steps then 2 straight
        let expected = Fixed::from_num(2) + SQRT_2 * Fixed::from_num(3);
        let diff = (octile_distance(5, 3) - expected).abs();
        assert!(diff < Fixed::from_num(0.000_001));
    }

    #[test]
    fn test_fixed_decimal_roundtrip_through_ron() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            #[serde(with = "fixed_decimal")]
            value: Fixed,
        }

        let parsed: Wrapper = ron::from_str("(value: 3.5)").expect("parse");
        assert_eq!(parsed.value, Fixed::from_num(3.5));
    }
}
