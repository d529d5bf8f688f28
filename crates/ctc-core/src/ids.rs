//! String-backed identifier wrappers.
//!
//! Unlike dense integer handles, every id in this system originates in the
//! external simulator (vehicle ids) or is derived from simulator strings
//! (platoon, intersection and reservation ids), so the wrappers own a
//! `String`.  All of them are `Ord + Hash` so they can key the ordered maps
//! that make phase iteration deterministic, and `Borrow<str>` so map lookups
//! work with plain `&str` keys.

use std::borrow::Borrow;
use std::fmt;

use crate::time::TimeStep;

/// Generate a typed id wrapper around an owned string.
macro_rules! string_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        $vis struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id! {
    /// A vehicle id exactly as reported by the simulator census.
    ///
    /// Route information is encoded in these ids by the traffic generator
    /// (e.g. `flow_up_to_left.3`); see [`crate::turn::route_from_id`].
    pub struct VehicleId;
}

string_id! {
    /// A platoon id.  Construct through the naming helpers below so the
    /// formation site is readable from the id itself.
    pub struct PlatoonId;
}

string_id! {
    /// An intersection id: the `:`-prefixed first token of an internal edge
    /// name (e.g. `:center`).
    pub struct IntersectionId;
}

string_id! {
    /// A reservation id, always `<platoon_id>_<intersection_id>` so at most
    /// one slot per platoon and intersection can exist.
    pub struct ReservationId;
}

impl PlatoonId {
    /// Id for a platoon formed behind `leader` on `edge`.
    pub fn formed(edge: &str, leader: &VehicleId) -> Self {
        Self(format!("p_{edge}_{leader}"))
    }

    /// Id for the group re-formed on `edge` after an edge-transition split.
    pub fn regrouped(edge: &str, leader: &VehicleId, step: TimeStep) -> Self {
        Self(format!("p_{edge}_{leader}_{step}"))
    }

    /// Id for the tail group produced by a size-cap split.
    pub fn capped(edge: &str, step: TimeStep) -> Self {
        Self(format!("p_split_{edge}_{step}"))
    }
}

impl ReservationId {
    /// The canonical slot id for `platoon` at `intersection`.
    pub fn slot(platoon: &PlatoonId, intersection: &IntersectionId) -> Self {
        Self(format!("{platoon}_{intersection}"))
    }
}
