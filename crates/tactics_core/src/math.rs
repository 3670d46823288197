//! Fixed-point math utilities for deterministic cost accounting.
//!
//! Path and movement costs are accumulated in fixed-point so that
//! comparisons inside the search queues are exact and results are
//! identical across platforms.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all cost math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Cost multiplier for a diagonal step (√2, rounded to the nearest bit).
pub const SQRT_2: Fixed = Fixed::from_bits(0x1_6A09_E668);

/// Fixed-point 2D vector, used for fractional world coordinates.
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

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }
}

/// Euclidean length of an integer offset, in fixed-point.
#[must_use]
pub fn euclidean(dx: i32, dy: i32) -> Fixed {
    let dx = i64::from(dx);
    let dy = i64::from(dy);
    let sq = dx * dx + dy * dy;
    fixed_sqrt(Fixed::saturating_from_num(sq))
}

/// Rounds a non-negative cost up to a whole number of action points.
#[must_use]
pub fn ceil_to_ap(cost: Fixed) -> u32 {
    if cost <= Fixed::ZERO {
        return 0;
    }
    cost.ceil().saturating_to_num::<u32>()
}

/// Computes the square root of a fixed-point number using binary search.
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::from_num(1) {
        value
    } else {
        Fixed::from_num(1)
    };

    // 64 halvings cover the full 32.32 range down to the last fractional bit.
    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        if mid == low {
            break;
        }
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}
