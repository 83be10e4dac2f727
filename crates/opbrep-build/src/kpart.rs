//! Special configurations of two operands that have a direct result.

use serde::{Deserialize, Serialize};

/// Special case detected before the general merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum KPart {
    /// One solid strictly inside the other, boundaries disjoint.
    IsKole = 1,
    /// One solid touching the other on a single face lying inside a face of the other.
    IsKoletge = 2,
    /// Disjoint solids.
    IsDisj = 3,
    /// Two coplanar faces, one inside the other.
    IsFafa = 4,
    /// Two solids with the same boundary faces.
    IsSoso = 5,
}

impl KPart {
    /// Numeric code of the case.
    pub fn code(self) -> u8 {
        self as u8
    }
}
