//! Per-point decisions: simplicity and end conditions

use crate::thinning::classify::VoxelState;
use crate::thinning::config::{ChangeDirection, EndPointPolicy};
use crate::topology::{Neighborhood, TopologicalNumbers, topological_numbers};

const TO_BE_CHANGED: u8 = VoxelState::ToBeChanged as u8;
const CAN_BE_CHANGED: u8 = VoxelState::CanBeChanged as u8;
const BACKGROUND: u8 = VoxelState::Background as u8;

fn clear(n: &mut Neighborhood, state: u8) {
    for v in n.iter_mut() {
        if *v == state {
            *v = BACKGROUND;
        }
    }
}

/// Simplicity test, before and after committing the pending marks.
///
/// The neighborhood is modified in place: pending marks are cleared the way
/// the test needs them. Returns whether the point is simple and the first
/// pair of topological numbers computed, used by the end conditions.
pub fn simplicity(
    n: &mut Neighborhood,
    planar: bool,
    change: ChangeDirection,
) -> (bool, TopologicalNumbers) {
    match change {
        ChangeDirection::ForegroundToBackground => {
            let t = topological_numbers(n, planar);
            if !t.is_simple() {
                return (false, t);
            }
            clear(n, TO_BE_CHANGED);
            (topological_numbers(n, planar).is_simple(), t)
        }
        ChangeDirection::BackgroundToForeground => {
            clear(n, CAN_BE_CHANGED);
            let t = topological_numbers(n, planar);
            if !t.is_simple() {
                return (false, t);
            }
            clear(n, TO_BE_CHANGED);
            (topological_numbers(n, planar).is_simple(), t)
        }
    }
}

/// Live cells (center included): can-be-changed, end points, foreground
pub fn live_count(n: &Neighborhood) -> usize {
    n.iter().filter(|&&v| VoxelState::is_live(v)).count()
}

/// Whether simple points are also checked for an end condition
pub fn checks_simple_end(policy: EndPointPolicy, planar: bool) -> bool {
    match policy {
        EndPointPolicy::Curve => true,
        EndPointPolicy::Surface => planar,
        _ => false,
    }
}

/// Curve extremity: a simple point with a single live neighbor is kept
pub fn simple_end_condition(n: &Neighborhood) -> bool {
    live_count(n) == 2
}

/// End condition for points that are not simple
pub fn non_simple_end_condition(n: &Neighborhood, t: TopologicalNumbers, policy: EndPointPolicy) -> bool {
    match policy {
        EndPointPolicy::Surface => t.background >= 2,
        EndPointPolicy::PureSurface => t.background == 2,
        EndPointPolicy::Curve => t.foreground >= 2,
        EndPointPolicy::PureCurve => t.foreground <= 2 && live_count(n) == 3,
        EndPointPolicy::None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::neighborhood::{cell, CENTER};

    #[test]
    fn test_pending_neighbor_breaks_simplicity() {
        // marked neighbor backed by a fixed one: still simple after commit
        let mut n = [0u8; 27];
        n[CENTER] = CAN_BE_CHANGED;
        n[cell(1, 0, 0)] = TO_BE_CHANGED;
        n[cell(1, 1, 0)] = 255;
        let (simple, t) = simplicity(&mut n.clone(), false, ChangeDirection::ForegroundToBackground);
        assert!(simple);
        assert!(t.is_simple());

        // once the marked point goes, the center would be isolated
        n[cell(1, 1, 0)] = 0;
        let (simple, t) = simplicity(&mut n, false, ChangeDirection::ForegroundToBackground);
        assert!(!simple);
        assert!(t.is_simple());
    }

    #[test]
    fn test_thickening_ignores_candidates() {
        let mut n = [0u8; 27];
        n[cell(1, 0, 0)] = 255;
        n[cell(-1, 0, 0)] = CAN_BE_CHANGED;
        let (simple, t) = simplicity(&mut n, false, ChangeDirection::BackgroundToForeground);
        assert!(simple);
        assert_eq!(t.foreground, 1);
    }

    #[test]
    fn test_end_conditions() {
        let mut n = [0u8; 27];
        n[CENTER] = CAN_BE_CHANGED;
        n[cell(1, 0, 0)] = 255;
        assert!(simple_end_condition(&n));
        n[cell(-1, 0, 0)] = CAN_BE_CHANGED;
        assert!(!simple_end_condition(&n));

        let line = TopologicalNumbers { background: 1, foreground: 2 };
        assert!(non_simple_end_condition(&n, line, EndPointPolicy::Curve));
        assert!(non_simple_end_condition(&n, line, EndPointPolicy::PureCurve));
        assert!(!non_simple_end_condition(&n, line, EndPointPolicy::Surface));
        assert!(!non_simple_end_condition(&n, line, EndPointPolicy::None));

        let sheet = TopologicalNumbers { background: 2, foreground: 1 };
        assert!(non_simple_end_condition(&n, sheet, EndPointPolicy::Surface));
        assert!(non_simple_end_condition(&n, sheet, EndPointPolicy::PureSurface));
        let triple = TopologicalNumbers { background: 3, foreground: 1 };
        assert!(!non_simple_end_condition(&n, triple, EndPointPolicy::PureSurface));
    }

    #[test]
    fn test_simple_end_policy() {
        assert!(checks_simple_end(EndPointPolicy::Curve, false));
        assert!(!checks_simple_end(EndPointPolicy::Surface, false));
        assert!(checks_simple_end(EndPointPolicy::Surface, true));
        assert!(!checks_simple_end(EndPointPolicy::PureCurve, true));
    }
}
