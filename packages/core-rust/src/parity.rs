//! Parity classification used by the router.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Even/odd class of an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    /// Classifies `n` with the truncating remainder: `n % 2 == 0` is even.
    ///
    /// Zero is even. For negative values the remainder is `0` or `-1`
    /// (`-7 % 2 == -1`), so the comparison against `0` classifies them
    /// correctly; a check against `1` would not.
    #[must_use]
    pub fn of(n: i64) -> Self {
        if n % 2 == 0 {
            Self::Even
        } else {
            Self::Odd
        }
    }

    #[must_use]
    pub fn is_even(self) -> bool {
        matches!(self, Self::Even)
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Even => "even",
            Self::Odd => "odd",
        })
    }
}
