//! Branch orders.
//!
//! Anchored edge ends seed the tree with order 1 and length 0. Lengths are
//! then relaxed over the graph until every end holds its shortest path to
//! the anchors. Orders are finally extracted level by level: the longest
//! path of each labeled subtree keeps the level, the rest moves one level
//! down.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

use crate::core::error::Error;
use crate::core::logging::elapsed_ms;
use crate::core::types::Result;
use crate::voxel_tree::{BranchInfo, EdgeEnd, VoxelTree};

/// Label of the first rooted subtree; other subtrees take fresh labels
const ROOT_LABEL: u32 = 1;

const fn rooted(label: u32) -> BranchInfo {
    BranchInfo { label, order: 1, length: 0.0, in_queue: false }
}

type Incidence = Vec<Vec<(usize, EdgeEnd)>>;

impl VoxelTree {
    /// Compute the branch label and order of every edge end, junction and
    /// point. Trees without anchors are left unordered.
    pub fn compute_branch_order(&mut self) -> Result<()> {
        if !self.has_anchors() {
            log::warn!("No anchor in the tree, branch orders left unset");
            return Ok(());
        }
        let start = Instant::now();
        let incidence = self.incidence();
        let mut next_label = ROOT_LABEL + 1;

        self.seed(&mut next_label)?;
        let passes = self.relax(&incidence)?;
        let levels = self.extract_orders(&incidence, &mut next_label)?;
        self.assign_point_orders();

        log::info!(
            "Branch orders: {} levels, {} labels, {} relaxation passes in {:.1}ms",
            levels,
            next_label - 1,
            passes,
            elapsed_ms(start)
        );
        Ok(())
    }

    /// Highest branch order carried by a point
    pub fn max_order(&self) -> u32 {
        let edges = self.edges.iter().flat_map(|e| e.points.iter());
        let junctions = self.junctions.iter().flat_map(|j| j.voxels.iter());
        edges.chain(junctions).map(|p| p.branch_order).max().unwrap_or(0)
    }

    /// Reset every end and junction, then root the anchored ends
    fn seed(&mut self, next_label: &mut u32) -> Result<()> {
        let total: f32 = self.edges.iter().map(|e| e.length).sum();
        let unset = BranchInfo { label: 0, order: 0, length: total, in_queue: true };
        for edge in &mut self.edges {
            edge.first_info = unset;
            edge.last_info = unset;
        }

        // one root label per connected subtree
        let (edge_part, junction_part) = self.connected_parts();
        let mut root_labels: HashMap<usize, u32> = HashMap::new();
        let mut root_label = |part: usize, next_label: &mut u32| -> u32 {
            if let Some(&label) = root_labels.get(&part) {
                return label;
            }
            let label = if root_labels.is_empty() {
                ROOT_LABEL
            } else {
                *next_label += 1;
                *next_label - 1
            };
            root_labels.insert(part, label);
            label
        };

        for j in 0..self.junctions.len() {
            self.junctions[j].info = if self.junctions[j].anchor {
                rooted(root_label(junction_part[j], next_label))
            } else {
                unset
            };
        }

        for e in 0..self.edges.len() {
            let edge = &self.edges[e];
            let first_anchor = edge.end_point(EdgeEnd::First).anchor;
            let last_anchor = edge.end_point(EdgeEnd::Last).anchor;
            if !(first_anchor || last_anchor) {
                continue;
            }
            let root = rooted(root_label(edge_part[e], next_label));
            if first_anchor && last_anchor {
                let edge = &mut self.edges[e];
                edge.first_info = root;
                edge.last_info = root;
                continue;
            }

            // the free part of the chain continues from the last anchored voxel
            let points = &edge.points;
            let n = points.len();
            let (anchored, tail) = if first_anchor {
                let k = points.iter().position(|p| !p.anchor).unwrap_or(n);
                (EdgeEnd::First, self.arc_length(points, k.saturating_sub(1), n - 1))
            } else {
                let k = points.iter().rposition(|p| !p.anchor).unwrap_or(0);
                (EdgeEnd::Last, self.arc_length(points, 0, (k + 1).min(n - 1)))
            };
            let label = *next_label;
            *next_label += 1;
            log::trace!("edge {} rooted, free part labeled {} ({:.2})", edge.label, label, tail);

            let edge = &mut self.edges[e];
            *edge.info_mut(anchored) = root;
            *edge.info_mut(anchored.other()) =
                BranchInfo { label, order: 1, length: tail, in_queue: false };
        }

        // carry the seeded ends into their junctions
        let mut seeded = Vec::new();
        for edge in &self.edges {
            if edge.first_info.in_queue != edge.last_info.in_queue {
                return Err(Error::consistency(format!(
                    "edge {} ends disagree on their queue state",
                    edge.label
                )));
            }
            for end in EdgeEnd::BOTH {
                let info = *edge.info(end);
                let Some(j) = edge.junction(end) else { continue };
                if info.in_queue {
                    continue;
                }
                let candidate = if info.length == 0.0 {
                    info
                } else {
                    let step = self.world(edge.end_point(end)).distance(self.junction_world(j));
                    BranchInfo { length: info.length + step, ..info }
                };
                seeded.push((j, candidate));
            }
        }
        for (j, candidate) in seeded {
            let info = &mut self.junctions[j].info;
            if info.in_queue || candidate.length < info.length {
                *info = candidate;
            }
        }
        Ok(())
    }

    /// Connected part of every edge and junction, edges linked through
    /// their junctions
    fn connected_parts(&self) -> (Vec<usize>, Vec<usize>) {
        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }

        let nj = self.junctions.len();
        let mut parent: Vec<usize> = (0..nj + self.edges.len()).collect();
        for (e, edge) in self.edges.iter().enumerate() {
            for j in [edge.first_junction, edge.last_junction].into_iter().flatten() {
                let (a, b) = (find(&mut parent, nj + e), find(&mut parent, j));
                parent[a] = b;
            }
        }
        let edges = (0..self.edges.len()).map(|e| find(&mut parent, nj + e)).collect();
        let junctions = (0..nj).map(|j| find(&mut parent, j)).collect();
        (edges, junctions)
    }

    /// Shorten in-queue lengths until nothing changes. Returns the number of
    /// passes run.
    pub(crate) fn relax(&mut self, incidence: &Incidence) -> Result<usize> {
        let bound = self.component_count() + 1;
        for pass in 0..bound {
            let mut changed = false;

            for edge in &mut self.edges {
                // a second look at the first end carries an update from the last
                for end in [EdgeEnd::First, EdgeEnd::Last, EdgeEnd::First] {
                    if !edge.info(end).in_queue {
                        continue;
                    }
                    let mut best = edge.info(end.other()).length + edge.length;
                    if let Some(j) = edge.junction(end) {
                        best = best.min(self.junctions[j].info.length);
                    }
                    if best < edge.info(end).length {
                        edge.info_mut(end).length = best;
                        changed = true;
                    }
                }
            }

            for (j, incident) in incidence.iter().enumerate() {
                if !self.junctions[j].info.in_queue {
                    continue;
                }
                if incident.len() < 3 {
                    return Err(Error::consistency(format!(
                        "junction {} has {} incident edges",
                        self.junctions[j].label,
                        incident.len()
                    )));
                }
                let best = incident
                    .iter()
                    .map(|&(e, end)| self.edges[e].info(end).length)
                    .fold(f32::INFINITY, f32::min);
                if best < self.junctions[j].info.length {
                    self.junctions[j].info.length = best;
                    changed = true;
                }
            }

            if !changed {
                log::debug!("Relaxation settled after {} passes", pass + 1);
                return Ok(pass + 1);
            }
        }
        Err(Error::consistency(format!("relaxation still changing after {} passes", bound)))
    }

    /// Assign orders level by level. Returns the number of levels reached.
    fn extract_orders(&mut self, incidence: &Incidence, next_label: &mut u32) -> Result<u32> {
        let max_level = self.edges.len() as u32 + 1;
        let mut k = 1;
        while self.propagate(k, incidence, next_label)? {
            if k > max_level {
                return Err(Error::consistency(format!("branch order exceeded {}", max_level)));
            }
            let labels = self.queued_labels(k);
            log::debug!("Order {}: {} labeled subtrees", k, labels.len());
            for label in labels {
                self.extract_trunk(label, incidence)?;
            }
            k += 1;
        }
        Ok(k - 1)
    }

    /// Spread order `k` over the in-queue part of the graph. Returns whether
    /// anything was labeled.
    fn propagate(&mut self, k: u32, incidence: &Incidence, next_label: &mut u32) -> Result<bool> {
        let mut assigned = false;
        loop {
            let mut progress = false;

            for e in 0..self.edges.len() {
                let edge = &self.edges[e];
                if !edge.first_info.in_queue || edge.first_info.is_labeled() {
                    continue;
                }
                let ordered: Vec<usize> = [edge.first_junction, edge.last_junction]
                    .into_iter()
                    .flatten()
                    .filter(|&j| self.junctions[j].info.order > 0)
                    .collect();
                let j = match ordered.as_slice() {
                    [] => continue,
                    [j] => *j,
                    _ => {
                        return Err(Error::consistency(format!(
                            "edge {} joins two ordered junctions",
                            edge.label
                        )));
                    }
                };

                let junction = self.junctions[j].info;
                let label = if junction.order == k {
                    junction.label
                } else if k > 1 && junction.order == k - 1 {
                    *next_label += 1;
                    *next_label - 1
                } else {
                    return Err(Error::consistency(format!(
                        "edge {} next to a junction of order {} while assigning order {}",
                        edge.label, junction.order, k
                    )));
                };
                let edge = &mut self.edges[e];
                for end in EdgeEnd::BOTH {
                    let info = edge.info_mut(end);
                    info.label = label;
                    info.order = k;
                }
                progress = true;
            }

            for (j, incident) in incidence.iter().enumerate() {
                let info = self.junctions[j].info;
                if !info.in_queue || info.is_labeled() {
                    continue;
                }
                let source = incident
                    .iter()
                    .map(|&(e, end)| *self.edges[e].info(end))
                    .find(|i| i.is_labeled() && i.order == k);
                if let Some(source) = source {
                    let info = &mut self.junctions[j].info;
                    info.label = source.label;
                    info.order = k;
                    progress = true;
                }
            }

            if !progress {
                return Ok(assigned);
            }
            assigned = true;
        }
    }

    /// Labels of order `k` still in the queue, in edge order
    fn queued_labels(&self, k: u32) -> Vec<u32> {
        let mut labels = Vec::new();
        for edge in &self.edges {
            let info = edge.first_info;
            if info.in_queue && info.order == k && !labels.contains(&info.label) {
                labels.push(info.label);
            }
        }
        labels
    }

    /// Settle the longest path of subtree `label`, reset the rest of it
    fn extract_trunk(&mut self, label: u32, incidence: &Incidence) -> Result<()> {
        let mut longest: Option<(usize, f32)> = None;
        for (e, edge) in self.edges.iter().enumerate() {
            if !edge.is_end_edge() || !edge.first_info.in_queue || edge.first_info.label != label {
                continue;
            }
            for end in EdgeEnd::BOTH {
                let length = edge.info(end).length;
                if edge.junction(end).is_none() && longest.is_none_or(|(_, best)| length > best) {
                    longest = Some((e, length));
                }
            }
        }

        if let Some((e, length)) = longest {
            log::trace!("label {}: trunk from edge {} ({:.2})", label, self.edges[e].label, length);
            self.backtrack(e, label, incidence)?;
        }

        for edge in &mut self.edges {
            if edge.first_info.in_queue && edge.first_info.label == label {
                for end in EdgeEnd::BOTH {
                    let info = edge.info_mut(end);
                    info.label = 0;
                    info.order = 0;
                }
            }
        }
        for junction in &mut self.junctions {
            if junction.info.in_queue && junction.info.label == label {
                junction.info.label = 0;
                junction.info.order = 0;
            }
        }
        Ok(())
    }

    /// Walk from edge `e` toward the settled tree along decreasing lengths,
    /// taking every visited edge and junction out of the queue
    fn backtrack(&mut self, mut e: usize, label: u32, incidence: &Incidence) -> Result<()> {
        let mut from: Option<usize> = None;
        for _ in 0..=self.component_count() {
            let edge = &mut self.edges[e];
            edge.first_info.in_queue = false;
            edge.last_info.in_queue = false;

            let next_junction = [edge.first_junction, edge.last_junction]
                .into_iter()
                .flatten()
                .filter(|&j| Some(j) != from)
                .min_by(|&a, &b| by_length(self.junctions[a].info.length, self.junctions[b].info.length));
            let Some(j) = next_junction else { return Ok(()) };
            if !self.junctions[j].info.in_queue {
                return Ok(());
            }
            self.junctions[j].info.in_queue = false;
            let junction_length = self.junctions[j].info.length;

            let next_edge = incidence[j]
                .iter()
                .filter(|&&(n, _)| {
                    let info = self.edges[n].first_info;
                    n != e && info.in_queue && info.label == label
                })
                .map(|&(n, end)| (n, self.edges[n].info(end.other()).length))
                .filter(|&(_, far)| far < junction_length)
                .min_by(|a, b| by_length(a.1, b.1));
            let Some((n, _)) = next_edge else { return Ok(()) };
            e = n;
            from = Some(j);
        }
        Err(Error::consistency(format!("trunk of label {} does not reach the settled tree", label)))
    }

    /// Copy end and junction values onto the points
    fn assign_point_orders(&mut self) {
        for edge in &mut self.edges {
            let (first, last) = (edge.first_info, edge.last_info);
            let anchored = if edge.points[0].anchor {
                Some((first, last))
            } else if edge.points[edge.points.len() - 1].anchor {
                Some((last, first))
            } else {
                None
            };
            for p in &mut edge.points {
                let info = match anchored {
                    Some((rooted, growing)) if first.label != last.label => {
                        if p.anchor { rooted } else { growing }
                    }
                    _ => first,
                };
                p.branch_label = info.label;
                p.branch_order = info.order;
            }
        }
        for junction in &mut self.junctions {
            for p in &mut junction.voxels {
                p.branch_label = junction.info.label;
                p.branch_order = junction.info.order;
            }
        }
    }
}

fn by_length(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel_tree::Edge;
    use crate::volume::Volume;

    /// Trunk along x ending in a vertical bar: a junction with three arms.
    /// The trunk's free end is anchored.
    fn y_shape(up: usize, down: usize) -> (Volume<u8>, Volume<u8>) {
        let height = up + down + 5;
        let mut vol = Volume::new([14, height, 1], 0u8).unwrap();
        let row = up + 2;
        for x in 1..11 {
            vol.set(x, row, 0, 255);
        }
        for y in (row - up - 1)..=(row + down + 1) {
            vol.set(11, y, 0, 255);
        }
        let mut anchors = Volume::new(vol.dims(), 0u8).unwrap();
        anchors.set(1, row, 0, 1);
        (vol, anchors)
    }

    fn edge_at(tree: &VoxelTree, coords: [usize; 3]) -> &Edge {
        tree.edges()
            .iter()
            .find(|e| e.points.iter().any(|p| p.coords == coords))
            .unwrap()
    }

    #[test]
    fn test_y_shape_longer_arm_continues_the_trunk() {
        let (vol, anchors) = y_shape(5, 7);
        let mut tree = VoxelTree::from_skeleton(&vol, Some(&anchors)).unwrap();
        assert_eq!(tree.junctions().len(), 1);
        assert_eq!(tree.edges().len(), 3);
        tree.compute_branch_order().unwrap();

        let row = 7;
        let trunk = edge_at(&tree, [1, row, 0]);
        assert!(trunk.points.iter().all(|p| p.branch_order == 1));
        assert_eq!(trunk.points[0].branch_label, 1);

        let up = edge_at(&tree, [11, 1, 0]);
        let down = edge_at(&tree, [11, row + 8, 0]);
        assert_eq!(down.order(), 1);
        assert_eq!(up.order(), 2);
        assert!(up.points.iter().all(|p| p.branch_order == 2));
        assert_ne!(up.first_info.label, down.first_info.label);
        assert_eq!(tree.max_order(), 2);
    }

    #[test]
    fn test_y_shape_swapped_lengths_swap_orders() {
        let (vol, anchors) = y_shape(7, 5);
        let mut tree = VoxelTree::from_skeleton(&vol, Some(&anchors)).unwrap();
        tree.compute_branch_order().unwrap();

        let row = 9;
        let up = edge_at(&tree, [11, 1, 0]);
        let down = edge_at(&tree, [11, row + 6, 0]);
        assert_eq!(up.order(), 1);
        assert_eq!(down.order(), 2);
    }

    #[test]
    fn test_disjoint_trees_keep_their_own_trunks() {
        // two Y shapes side by side, trunks fully anchored
        let (up, down, row) = (5, 7, 7);
        let mut vol = Volume::new([28, up + down + 5, 1], 0u8).unwrap();
        let mut anchors = Volume::new(vol.dims(), 0u8).unwrap();
        for x0 in [0, 14] {
            for x in 1..11 {
                vol.set(x0 + x, row, 0, 255);
                anchors.set(x0 + x, row, 0, 1);
            }
            for y in (row - up - 1)..=(row + down + 1) {
                vol.set(x0 + 11, y, 0, 255);
            }
        }
        let mut tree = VoxelTree::from_skeleton(&vol, Some(&anchors)).unwrap();
        assert_eq!(tree.junctions().len(), 2);
        tree.compute_branch_order().unwrap();

        for x0 in [0, 14] {
            let up = edge_at(&tree, [x0 + 11, 1, 0]);
            let down = edge_at(&tree, [x0 + 11, row + 8, 0]);
            assert_eq!(down.order(), 1);
            assert_eq!(up.order(), 2);
        }
        let left = edge_at(&tree, [1, row, 0]).first_info.label;
        let right = edge_at(&tree, [15, row, 0]).first_info.label;
        assert_ne!(left, right);
        assert_eq!(tree.max_order(), 2);
    }

    #[test]
    fn test_relaxation_reaches_a_fixpoint() {
        let (vol, anchors) = y_shape(5, 7);
        let mut tree = VoxelTree::from_skeleton(&vol, Some(&anchors)).unwrap();
        let incidence = tree.incidence();
        let mut next_label = ROOT_LABEL + 1;
        tree.seed(&mut next_label).unwrap();
        tree.relax(&incidence).unwrap();

        let junction = tree.junctions()[0].info;
        assert!(!junction.in_queue);
        for edge in tree.edges() {
            for end in EdgeEnd::BOTH {
                let info = edge.info(end);
                if !info.in_queue {
                    continue;
                }
                let mut expected = edge.info(end.other()).length + edge.length;
                if edge.junction(end).is_some() {
                    expected = expected.min(junction.length);
                }
                assert!((info.length - expected).abs() < 1e-4);
            }
        }
        // nothing left to shorten
        assert_eq!(tree.relax(&incidence).unwrap(), 1);
    }

    #[test]
    fn test_anchored_line_is_order_one() {
        let mut vol = Volume::new([11, 3, 3], 0u8).unwrap();
        let mut anchors = Volume::new(vol.dims(), 0u8).unwrap();
        for x in 1..10 {
            vol.set(x, 1, 1, 255);
        }
        anchors.set(1, 1, 1, 1);
        anchors.set(9, 1, 1, 1);
        let mut tree = VoxelTree::from_skeleton(&vol, Some(&anchors)).unwrap();
        tree.compute_branch_order().unwrap();

        let edge = &tree.edges()[0];
        assert_eq!(edge.voxel_count(), 9);
        assert!(edge.points.iter().all(|p| p.branch_order == 1 && p.branch_label == 1));
        assert_eq!(tree.max_order(), 1);
    }

    #[test]
    fn test_half_anchored_edge_splits_labels() {
        let mut vol = Volume::new([11, 3, 3], 0u8).unwrap();
        let mut anchors = Volume::new(vol.dims(), 0u8).unwrap();
        for x in 1..10 {
            vol.set(x, 1, 1, 255);
        }
        anchors.set(8, 1, 1, 1);
        anchors.set(9, 1, 1, 1);
        let mut tree = VoxelTree::from_skeleton(&vol, Some(&anchors)).unwrap();
        tree.compute_branch_order().unwrap();

        let edge = &tree.edges()[0];
        // walked from x = 1, the anchored voxels are at the last end
        assert_eq!(edge.last_info.label, 1);
        assert_eq!(edge.first_info.label, 2);
        assert!((edge.first_info.length - 7.0).abs() < 1e-5);
        assert_eq!(edge.points[8].branch_label, 1);
        assert_eq!(edge.points[0].branch_label, 2);
        assert!(edge.points.iter().all(|p| p.branch_order == 1));
    }

    #[test]
    fn test_no_anchor_leaves_orders_unset() {
        let (vol, _) = y_shape(5, 7);
        let mut tree = VoxelTree::from_skeleton(&vol, None).unwrap();
        tree.compute_branch_order().unwrap();
        assert_eq!(tree.max_order(), 0);
    }
}
