//! The fixed road topology: a single four-way crossing.
//!
//! Eight canonical edges surround the junction, named for the compass arm
//! they sit on and the direction of travel (`up_incoming` flows *toward* the
//! crossing, `up_leaving` away from it).  Edge lengths come from the
//! simulator network file and are part of the domain configuration; opposite
//! arms share lengths.
//!
//! Internal (in-junction) edges are dynamic simulator strings beginning with
//! `:` and never parse to an [`Edge`].  Classification of raw edge names
//! happens here, once, at the boundary — the rest of the engine works with
//! `Option<Edge>` and id types.

use std::fmt;

/// One of the eight canonical road segments around the crossing.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Edge {
    UpIncoming,
    UpLeaving,
    DownIncoming,
    DownLeaving,
    LeftIncoming,
    LeftLeaving,
    RightIncoming,
    RightLeaving,
}

use Edge::*;

impl Edge {
    /// All canonical edges, in a fixed order usable for deterministic sweeps.
    pub const ALL: [Edge; 8] = [
        DownIncoming,
        DownLeaving,
        LeftIncoming,
        LeftLeaving,
        RightIncoming,
        RightLeaving,
        UpIncoming,
        UpLeaving,
    ];

    /// The four approach edges, in the order used by axis comparisons.
    pub const INCOMING: [Edge; 4] = [DownIncoming, UpIncoming, LeftIncoming, RightIncoming];

    /// Parse a raw simulator edge name.  Internal edges (`:` prefix) and
    /// unknown names return `None`.
    pub fn parse(name: &str) -> Option<Edge> {
        Some(match name {
            "down_incoming" => DownIncoming,
            "down_leaving" => DownLeaving,
            "left_incoming" => LeftIncoming,
            "left_leaving" => LeftLeaving,
            "right_incoming" => RightIncoming,
            "right_leaving" => RightLeaving,
            "up_incoming" => UpIncoming,
            "up_leaving" => UpLeaving,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DownIncoming => "down_incoming",
            DownLeaving => "down_leaving",
            LeftIncoming => "left_incoming",
            LeftLeaving => "left_leaving",
            RightIncoming => "right_incoming",
            RightLeaving => "right_leaving",
            UpIncoming => "up_incoming",
            UpLeaving => "up_leaving",
        }
    }

    /// Segment length in metres, from the simulator network file.
    pub fn length_m(self) -> f64 {
        match self {
            DownIncoming | UpLeaving => 126.23,
            DownLeaving | UpIncoming => 126.10,
            LeftIncoming | RightLeaving => 128.80,
            LeftLeaving | RightIncoming => 124.29,
        }
    }

    /// Whether the edge touches the junction.  True for the whole table in
    /// this single-crossing topology; kept as a method so at-intersection
    /// logic reads the same as it would on a larger network.
    pub fn connects_to_junction(self) -> bool {
        true
    }

    #[inline]
    pub fn is_incoming(self) -> bool {
        matches!(self, DownIncoming | UpIncoming | LeftIncoming | RightIncoming)
    }

    #[inline]
    pub fn is_leaving(self) -> bool {
        !self.is_incoming()
    }

    /// The approach on the opposite arm.  `None` for leaving edges — the
    /// opposite relation only drives conflict rules between approaches.
    pub fn opposite(self) -> Option<Edge> {
        Some(match self {
            DownIncoming => UpIncoming,
            UpIncoming => DownIncoming,
            LeftIncoming => RightIncoming,
            RightIncoming => LeftIncoming,
            _ => return None,
        })
    }

    /// The approach immediately to this approach's left — the edge whose
    /// straight-through traffic crosses a right turn from `self`.
    pub fn left_neighbor(self) -> Option<Edge> {
        Some(match self {
            DownIncoming => RightIncoming,
            LeftIncoming => DownIncoming,
            UpIncoming => LeftIncoming,
            RightIncoming => UpIncoming,
            _ => return None,
        })
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Raw-name classification ───────────────────────────────────────────────────

/// Length lookup for a raw edge name.  Unknown edges (including internal
/// ones) have no length — callers treat that as "not near the junction"
/// rather than an error.
pub fn edge_length(name: &str) -> Option<f64> {
    Edge::parse(name).map(Edge::length_m)
}

/// Is `name` an internal (in-junction) edge?
#[inline]
pub fn is_internal(name: &str) -> bool {
    name.starts_with(':')
}

/// The intersection id owning an internal edge: the first `_`-delimited
/// token, `:` included (`:center_1_0` → `:center`).
pub fn intersection_prefix(name: &str) -> Option<&str> {
    if !is_internal(name) {
        return None;
    }
    Some(name.split('_').next().unwrap_or(name))
}

/// The source-approach token baked into an internal edge name, used to key
/// in-junction vehicles back to the edge they entered from
/// (`:center_1_0` → `1`).
pub fn internal_source_token(name: &str) -> Option<&str> {
    if !is_internal(name) {
        return None;
    }
    name.split('_').nth(1)
}

/// True when `a` and `b` straddle the junction (one approach edge, one exit
/// edge, in either order).  Platoons never span such a pair.
pub fn is_edge_transition(a: &str, b: &str) -> bool {
    match (Edge::parse(a), Edge::parse(b)) {
        (Some(ea), Some(eb)) => {
            (ea.is_incoming() && eb.is_leaving()) || (ea.is_leaving() && eb.is_incoming())
        }
        _ => false,
    }
}
