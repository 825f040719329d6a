// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Core identifier types for catalog, roster and lending records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Unique identifier for a catalog title.
    BookId
);
id_type!(
    /// Unique identifier for a library member.
    MemberId
);
id_type!(
    /// Identifier of the staff member who recorded a loan.
    ///
    /// Staff accounts live outside the lending engine; the id is carried
    /// on each transaction for auditing only.
    StaffId
);
id_type!(
    /// Unique identifier for a lending transaction.
    TransactionId
);
id_type!(
    /// Unique identifier for a fine.
    FineId
);
id_type!(CategoryId);
id_type!(AuthorId);

/// Monotonic id allocator shared by the stores.
///
/// Ids start at 1. After a snapshot restore the sequence is bumped past the
/// highest restored id with [`IdSequence::observe`].
#[derive(Debug)]
pub(crate) struct IdSequence(AtomicU32);

impl IdSequence {
    pub(crate) fn new() -> Self {
        Self(AtomicU32::new(1))
    }

    pub(crate) fn next(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn observe(&self, id: u32) {
        self.0.fetch_max(id.saturating_add(1), Ordering::SeqCst);
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_inner_value() {
        assert_eq!(BookId(7).to_string(), "7");
        assert_eq!(TransactionId(42).to_string(), "42");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&MemberId(3)).unwrap();
        assert_eq!(json, "3");
        let back: MemberId = serde_json::from_str("3").unwrap();
        assert_eq!(back, MemberId(3));
    }

    #[test]
    fn sequence_starts_at_one_and_skips_observed_ids() {
        let seq = IdSequence::new();
        assert_eq!(seq.next(), 1);
        seq.observe(10);
        assert_eq!(seq.next(), 11);
        // Observing a lower id never rewinds.
        seq.observe(2);
        assert_eq!(seq.next(), 12);
    }
}
