//! Turn classification and the movement-compatibility oracle.
//!
//! A queued vehicle's intended movement is inferred from, in order of
//! preference: internal-lane name hints, the static turn table applied to a
//! known next edge, the route baked into its id by the traffic generator,
//! and finally lane-name heuristics.  All of that string matching lives here
//! at the boundary; the arbiter itself only sees [`TurnDirection`] values.

use crate::edge::Edge;

/// Intended movement through the crossing.
///
/// A vehicle with no classification yet carries `Option<TurnDirection>` —
/// `None` is "unset", not "straight".
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TurnDirection {
    Left,
    Right,
    Straight,
}

impl TurnDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnDirection::Left => "left",
            TurnDirection::Right => "right",
            TurnDirection::Straight => "straight",
        }
    }
}

impl std::fmt::Display for TurnDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Static turn table ─────────────────────────────────────────────────────────

/// The movement implied by travelling from `from` onto `to`.
///
/// Only approach→exit pairs are meaningful; every unlisted combination
/// defaults to straight, matching the simulator's permissive net definition.
pub fn turn_between(from: Edge, to: Edge) -> TurnDirection {
    use Edge::*;
    use TurnDirection::*;
    match (from, to) {
        (DownIncoming, LeftLeaving) => Right,
        (DownIncoming, DownLeaving) => Straight,
        (DownIncoming, RightLeaving) => Left,

        (LeftIncoming, UpLeaving) => Right,
        (LeftIncoming, LeftLeaving) => Straight,
        (LeftIncoming, DownLeaving) => Left,

        (UpIncoming, RightLeaving) => Right,
        (UpIncoming, UpLeaving) => Straight,
        (UpIncoming, LeftLeaving) => Left,

        (RightIncoming, DownLeaving) => Right,
        (RightIncoming, RightLeaving) => Straight,
        (RightIncoming, UpLeaving) => Left,

        _ => Straight,
    }
}

// ── Route inference from vehicle ids ──────────────────────────────────────────

/// Recover the `(approach, exit)` pair from a generator-assigned vehicle id.
///
/// Ids embed an origin→destination tag such as `up_to_left`.  Note the
/// compass flip: a vehicle *from* the up arm drives on `down_incoming`,
/// because edges are named for their direction of travel.
pub fn route_from_id(vehicle_id: &str) -> Option<(Edge, Edge)> {
    use Edge::*;

    const ORIGINS: [(&str, Edge); 4] = [
        ("up", DownIncoming),
        ("down", UpIncoming),
        ("left", RightIncoming),
        ("right", LeftIncoming),
    ];
    const DESTS: [(&str, Edge); 4] = [
        ("up", UpLeaving),
        ("down", DownLeaving),
        ("left", LeftLeaving),
        ("right", RightLeaving),
    ];

    for (origin, approach) in ORIGINS {
        for (dest, exit) in DESTS {
            if origin == dest {
                continue;
            }
            let tag = format!("{origin}_to_{dest}");
            if vehicle_id.contains(&tag) {
                return Some((approach, exit));
            }
        }
    }
    None
}

// ── Lane-name hints ───────────────────────────────────────────────────────────

/// Classify an *internal* lane name.
///
/// Checks, in order: explicit `_left`/`_right` markers, then the simulator's
/// connection-lane suffixes `_l` / `_sl` (left) and `_r` / `_sr` (right),
/// each optionally followed by a single digit, then bare `left`/`right`
/// substrings.  Everything else is a through lane.
pub fn internal_lane_turn(lane: &str) -> TurnDirection {
    let lower = lane.to_ascii_lowercase();
    if lower.contains("_left") {
        return TurnDirection::Left;
    }
    if lower.contains("_right") {
        return TurnDirection::Right;
    }
    if has_connection_suffix(&lower, &["_l", "_sl"]) || lower.contains("left") {
        return TurnDirection::Left;
    }
    if has_connection_suffix(&lower, &["_r", "_sr"]) || lower.contains("right") {
        return TurnDirection::Right;
    }
    TurnDirection::Straight
}

/// Weak lane heuristic used when no route information exists at all.
pub fn lane_turn_hint(lane: &str) -> Option<TurnDirection> {
    if lane.contains("left") || lane.contains("_l") {
        Some(TurnDirection::Left)
    } else if lane.contains("right") || lane.contains("_r") {
        Some(TurnDirection::Right)
    } else {
        None
    }
}

/// Does `lane` end in one of `stems`, optionally followed by one digit?
fn has_connection_suffix(lane: &str, stems: &[&str]) -> bool {
    for stem in stems {
        if lane.ends_with(stem) {
            return true;
        }
        // Allow a single trailing lane index digit.
        let mut chars = lane.chars();
        if let Some(last) = chars.next_back() {
            if last.is_ascii_digit() && chars.as_str().ends_with(stem) {
                return true;
            }
        }
    }
    false
}

// ── Movement-compatibility oracle ─────────────────────────────────────────────

/// Can two movements use the crossing simultaneously?
///
/// Compatible iff:
/// - both come from the same approach, or
/// - they come from opposite approaches and both turn right, or
/// - one turns right while the other approach is its left neighbor and that
///   other movement is neither straight nor left (symmetric).
///
/// Approaches are compared as raw edge-key strings because in-junction
/// vehicles are bucketed under derived keys; keys that do not parse to a
/// canonical edge can only be compatible by literal equality.
pub fn movements_compatible(
    edge_a: &str,
    dir_a: Option<TurnDirection>,
    edge_b: &str,
    dir_b: Option<TurnDirection>,
) -> bool {
    use TurnDirection::*;

    if edge_a == edge_b {
        return true;
    }

    let (ea, eb) = (Edge::parse(edge_a), Edge::parse(edge_b));

    if let (Some(a), Some(b)) = (ea, eb) {
        if a.opposite() == Some(b) {
            return dir_a == Some(Right) && dir_b == Some(Right);
        }
    }

    if dir_a == Some(Right) {
        if let Some(b) = eb {
            if b.left_neighbor().map(Edge::as_str) == Some(edge_a) {
                return dir_b != Some(Straight) && dir_b != Some(Left);
            }
        }
    }

    if dir_b == Some(Right) {
        if let Some(a) = ea {
            if a.left_neighbor().map(Edge::as_str) == Some(edge_b) {
                return dir_a != Some(Straight) && dir_a != Some(Left);
            }
        }
    }

    false
}
