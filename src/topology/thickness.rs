//! Directional thickness checks
//!
//! A point may only be changed in direction `d` if its neighbor in that
//! direction is background and the opposite side still holds foreground.
//! The opposite side is one cell (4/6-thickness), the face center plus its
//! four edge neighbors (18), or the full opposite face (8/26). In 3D the six
//! directions check z-1, z+1, y-1, y+1, x-1, x+1; in 2D the four directions
//! check y-1, y+1, x+1, x-1.

use crate::topology::neighborhood::{Connectivity, Neighborhood};

const fn abs(v: i32) -> i32 {
    if v < 0 { -v } else { v }
}

/// (checked cell mask, opposite cell set mask) for a direction
const fn direction_masks(axis: usize, sign: i32, spread: i32, planar: bool) -> (u32, u32) {
    let mut checked = 0u32;
    let mut opposite = 0u32;
    let mut i = 0;
    while i < 27 {
        let d = [(i % 3) as i32 - 1, ((i / 3) % 3) as i32 - 1, (i / 9) as i32 - 1];
        let mut others = 0;
        let mut a = 0;
        while a < 3 {
            if a != axis {
                others += abs(d[a]);
            }
            a += 1;
        }
        let in_plane = !planar || d[2] == 0;
        if d[axis] == sign && others == 0 {
            checked |= 1 << i;
        }
        if in_plane && d[axis] == -sign && others <= spread {
            opposite |= 1 << i;
        }
        i += 1;
    }
    (checked, opposite)
}

const fn table_3d(spread: i32) -> [(u32, u32); 6] {
    [
        direction_masks(2, -1, spread, false),
        direction_masks(2, 1, spread, false),
        direction_masks(1, -1, spread, false),
        direction_masks(1, 1, spread, false),
        direction_masks(0, -1, spread, false),
        direction_masks(0, 1, spread, false),
    ]
}

const fn table_2d(spread: i32) -> [(u32, u32); 4] {
    [
        direction_masks(1, -1, spread, true),
        direction_masks(1, 1, spread, true),
        direction_masks(0, 1, spread, true),
        direction_masks(0, -1, spread, true),
    ]
}

const THICK6: [(u32, u32); 6] = table_3d(0);
const THICK18: [(u32, u32); 6] = table_3d(1);
const THICK26: [(u32, u32); 6] = table_3d(2);
const THICK4_PLANAR: [(u32, u32); 4] = table_2d(0);
const THICK8_PLANAR: [(u32, u32); 4] = table_2d(2);

/// Number of principal directions swept per cycle
pub fn direction_count(planar: bool) -> usize {
    if planar { 4 } else { 6 }
}

/// True when the point passes the thickness test for `direction`.
///
/// Cells with a value greater than `threshold` count as foreground.
pub fn check_thickness(
    n: &Neighborhood,
    thickness: Connectivity,
    threshold: u8,
    direction: usize,
    planar: bool,
) -> bool {
    let (checked, opposite) = if planar {
        match thickness {
            Connectivity::C4 | Connectivity::C6 => THICK4_PLANAR[direction],
            _ => THICK8_PLANAR[direction],
        }
    } else {
        match thickness {
            Connectivity::C4 | Connectivity::C6 => THICK6[direction],
            Connectivity::C18 => THICK18[direction],
            Connectivity::C8 | Connectivity::C26 => THICK26[direction],
        }
    };

    let fg = n
        .iter()
        .enumerate()
        .fold(0u32, |m, (i, &v)| if v > threshold { m | (1 << i) } else { m });

    fg & checked == 0 && fg & opposite != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::neighborhood::cell;

    #[test]
    fn test_table_shapes() {
        for d in 0..6 {
            assert_eq!(THICK6[d].0.count_ones(), 1);
            assert_eq!(THICK6[d].1.count_ones(), 1);
            assert_eq!(THICK18[d].1.count_ones(), 5);
            assert_eq!(THICK26[d].1.count_ones(), 9);
        }
        for d in 0..4 {
            assert_eq!(THICK4_PLANAR[d].1.count_ones(), 1);
            assert_eq!(THICK8_PLANAR[d].1.count_ones(), 3);
        }
        // direction 0 checks z-1 against z+1
        assert_eq!(THICK6[0], (1 << 4, 1 << 22));
        assert_eq!(THICK18[5].1, (1 << 12) | (1 << 3) | (1 << 9) | (1 << 15) | (1 << 21));
        assert_eq!(THICK8_PLANAR[0].1, (1 << 15) | (1 << 16) | (1 << 17));
    }

    #[test]
    fn test_border_point_passes() {
        // point on the top face of a slab: nothing above, material below
        let mut n = [0u8; 27];
        for y in -1..=1 {
            for x in -1..=1 {
                n[cell(x, y, 0)] = 255;
                n[cell(x, y, 1)] = 255;
            }
        }
        assert!(check_thickness(&n, Connectivity::C26, 0, 0, false));
        assert!(!check_thickness(&n, Connectivity::C26, 0, 1, false));
    }

    #[test]
    fn test_thin_slab_rejected_in_six() {
        // single layer: the opposite cell is empty for 6-thickness,
        // but 26-thickness sees nothing either
        let mut n = [0u8; 27];
        for y in -1..=1 {
            for x in -1..=1 {
                n[cell(x, y, 0)] = 255;
            }
        }
        assert!(!check_thickness(&n, Connectivity::C6, 0, 0, false));
        assert!(!check_thickness(&n, Connectivity::C26, 0, 0, false));
    }

    #[test]
    fn test_diagonal_support_depends_on_mode() {
        let mut n = [0u8; 27];
        n[cell(0, 0, 0)] = 255;
        n[cell(1, 1, 1)] = 255;
        assert!(!check_thickness(&n, Connectivity::C6, 0, 0, false));
        assert!(!check_thickness(&n, Connectivity::C18, 0, 0, false));
        assert!(check_thickness(&n, Connectivity::C26, 0, 0, false));
    }

    #[test]
    fn test_threshold_for_thickening() {
        let mut n = [0u8; 27];
        n[cell(0, 0, 1)] = 150;
        assert!(check_thickness(&n, Connectivity::C6, 0, 0, false));
        assert!(!check_thickness(&n, Connectivity::C6, 200, 0, false));
    }

    #[test]
    fn test_planar_directions() {
        let mut n = [0u8; 27];
        n[cell(-1, 0, 0)] = 255;
        // direction 2 checks x+1, opposite side is x-1
        assert!(check_thickness(&n, Connectivity::C4, 0, 2, true));
        assert!(!check_thickness(&n, Connectivity::C4, 0, 3, true));
    }
}
