// vbtracker_core/src/types.rs

use std::fmt;

// --- Core Type Aliases ---
/// All beacon ids, zero- or one-based, wrap a signed integer. Negative values
/// are reserved as "unidentified" sentinels.
pub type UnderlyingBeaconId = i32;

// --- Type-safe beacon identifiers ---
// Both flavours share the same shape; the macro keeps them as distinct types so
// a zero-based index can never be handed to an API that expects a one-based id.
macro_rules! beacon_id_type {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
        pub struct $name(Option<UnderlyingBeaconId>);

        impl $name {
            pub const fn new(value: UnderlyingBeaconId) -> Self {
                Self(Some(value))
            }

            /// An id that has not been assigned at all.
            pub const fn empty() -> Self {
                Self(None)
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_none()
            }

            /// The wrapped value, or `None` when no id was assigned.
            pub fn value(&self) -> Option<UnderlyingBeaconId> {
                self.0
            }
        }

        impl From<UnderlyingBeaconId> for $name {
            fn from(value: UnderlyingBeaconId) -> Self {
                Self::new(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.0 {
                    Some(v) => write!(f, "{}({})", $label, v),
                    None => write!(f, "{}(empty)", $label),
                }
            }
        }
    };
}

beacon_id_type!(
    /// Zero-based beacon id, used for indexing the per-beacon tables of a target.
    ZeroBasedBeaconId,
    "beacon0"
);
beacon_id_type!(
    /// One-based beacon id, the human-facing numbering used in layouts and logs.
    OneBasedBeaconId,
    "beacon1"
);

impl ZeroBasedBeaconId {
    /// True if this id names an actual beacon.
    pub fn is_identified(&self) -> bool {
        matches!(self.0, Some(v) if v >= 0)
    }

    /// The table index for an identified id.
    pub fn index(&self) -> Option<usize> {
        match self.0 {
            Some(v) if v >= 0 => Some(v as usize),
            _ => None,
        }
    }

    pub fn from_index(index: usize) -> Self {
        Self::new(index as UnderlyingBeaconId)
    }
}

impl OneBasedBeaconId {
    /// True if this id names an actual beacon.
    pub fn is_identified(&self) -> bool {
        matches!(self.0, Some(v) if v > 0)
    }
}

/// Conversion of any beacon id into its one-based form.
///
/// Empty ids stay empty and negative sentinels pass through untouched, so the
/// conversion is idempotent: converting an already one-based id is a no-op.
pub trait ToOneBased {
    fn to_one_based(&self) -> OneBasedBeaconId;
}

impl ToOneBased for ZeroBasedBeaconId {
    fn to_one_based(&self) -> OneBasedBeaconId {
        match self.0 {
            None => OneBasedBeaconId::empty(),
            Some(v) if v < 0 => OneBasedBeaconId::new(v),
            Some(v) => OneBasedBeaconId::new(v + 1),
        }
    }
}

impl ToOneBased for OneBasedBeaconId {
    fn to_one_based(&self) -> OneBasedBeaconId {
        *self
    }
}

// --- Body identifier ---
/// Index of a tracked body inside its tracking system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct BodyId(pub u32);

impl BodyId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body{}", self.0)
    }
}
