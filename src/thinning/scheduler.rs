//! Priority-ordered, direction-by-direction thinning

use std::time::Instant;

use crate::core::logging::elapsed_ms;
use crate::core::types::Result;
use crate::thinning::bucket::{BucketQueue, Candidate, Sweep};
use crate::thinning::classify::{binarize, VoxelState, FOREGROUND};
use crate::thinning::config::{ChangeDirection, EndPointPolicy, ThinningConfig};
use crate::thinning::rules::{
    checks_simple_end, non_simple_end_condition, simple_end_condition, simplicity,
};
use crate::topology::{check_thickness, direction_count, NeighborhoodExtractor};
use crate::volume::Volume;

const CAN_BE_CHANGED: u8 = VoxelState::CanBeChanged as u8;
const TO_BE_CHANGED: u8 = VoxelState::ToBeChanged as u8;
const END_POINT: u8 = VoxelState::EndPoint as u8;

/// Outcome of a thinning run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ThinningReport {
    /// Voxels that were eligible for change
    pub candidates: usize,
    /// Voxels changed (removed when thinning, added when thickening)
    pub removed: usize,
    /// Voxels frozen by an end condition
    pub end_points: usize,
    /// Cycles run, including the final unproductive ones
    pub iterations: u32,
    /// Cycles that changed something
    pub successful_iterations: u32,
}

/// Thin `volume` in place, processing candidates by `priority`.
///
/// `volume` holds the classification values: background, can-be-changed
/// and anchor. Only can-be-changed voxels are touched. On return the volume
/// is binarized (0 / 255). Validation errors leave the volume untouched.
pub fn thin(
    volume: &mut Volume<u8>,
    priority: &Volume<u16>,
    config: &ThinningConfig,
) -> Result<ThinningReport> {
    config.validate()?;
    volume.ensure_same_dims(priority)?;
    let start = Instant::now();

    let [first_value, last_value] = match config.value_span {
        Some(span) => span,
        None => [0, priority.data().iter().copied().max().unwrap_or(0) as u32],
    };
    let mut queue = BucketQueue::new(first_value, last_value, config.bin_length)?;

    let extractor = NeighborhoodExtractor::new(volume.dims());
    for (index, &v) in volume.data().iter().enumerate() {
        if v != CAN_BE_CHANGED {
            continue;
        }
        let coords = volume.coords(index);
        let candidate = Candidate {
            index,
            coords,
            inside: extractor.is_inside(coords),
            state: CAN_BE_CHANGED,
        };
        queue.push(priority.data()[index] as u32, candidate)?;
    }

    let mut report = ThinningReport { candidates: queue.len(), ..Default::default() };
    log::debug!(
        "Thinning: {} candidates in {} buckets, values [{}, {}]",
        report.candidates,
        queue.bucket_count(),
        first_value,
        last_value
    );

    if report.candidates > 0 {
        run(volume, &mut queue, &extractor, config, first_value, &mut report);
    }
    binarize(volume, config.change);

    log::info!(
        "Thinning done in {:.1}ms: {} of {} candidates changed, {} end points, {} cycles",
        elapsed_ms(start),
        report.removed,
        report.candidates,
        report.end_points,
        report.iterations
    );
    Ok(report)
}

fn run(
    volume: &mut Volume<u8>,
    queue: &mut BucketQueue,
    extractor: &NeighborhoodExtractor,
    config: &ThinningConfig,
    first_value: u32,
    report: &mut ThinningReport,
) {
    let planar = extractor.is_planar();
    let directions = direction_count(planar);
    let threshold = match config.change {
        ChangeDirection::ForegroundToBackground => VoxelState::Background as u8,
        ChangeDirection::BackgroundToForeground => END_POINT,
    };
    let simple_end = checks_simple_end(config.end_point, planar);
    let max_iteration = config.max_iteration.filter(|&m| m > 0);
    let within_bound = |iteration: u32| max_iteration.is_none_or(|m| iteration < m);
    let cycles_gate = config.cycles_before_ending.filter(|&c| c > 0);
    let value_gate = config
        .value_before_ending
        .filter(|&v| v > 0)
        .map(|v| (v as i64 - first_value as i64).div_euclid(config.bin_length as i64) as isize);

    let sweep = Sweep::new(queue.bucket_count(), config.ordering);
    let mut first = sweep.first();
    let mut index = first;

    loop {
        // skip leading empty buckets, then advance to the next non-empty one
        if index == first {
            while sweep.contains(first) && queue.bucket(first as usize).is_empty() {
                first += sweep.step();
                index = first;
            }
        }
        if !sweep.contains(first) {
            break;
        }
        while sweep.contains(index) && queue.bucket(index as usize).is_empty() {
            index += sweep.step();
        }
        if !sweep.contains(index) {
            break;
        }

        let bucket = queue.bucket_mut(index as usize);
        let mut cycle = 0u32;
        let mut removed_in_bucket = 0usize;

        loop {
            let mut removed_in_cycle = 0usize;
            let mut ends_in_cycle = 0usize;

            for direction in 0..directions {
                let mut marked = 0usize;

                for c in bucket.iter_mut() {
                    let mut n = extractor.extract(volume.data(), c.coords, c.inside);
                    if !check_thickness(&n, config.thickness, threshold, direction, planar) {
                        continue;
                    }

                    let (simple, numbers) = simplicity(&mut n, planar, config.change);
                    if simple {
                        if !(simple_end && simple_end_condition(&n)) {
                            c.state = TO_BE_CHANGED;
                            volume.data_mut()[c.index] = TO_BE_CHANGED;
                            marked += 1;
                        }
                        continue;
                    }

                    if config.end_point == EndPointPolicy::None {
                        continue;
                    }
                    if value_gate.is_some_and(|gate| sweep.is_before(index, gate)) {
                        continue;
                    }
                    if cycles_gate.is_some_and(|gate| cycle < gate) {
                        continue;
                    }
                    if non_simple_end_condition(&n, numbers, config.end_point) {
                        c.state = END_POINT;
                        volume.data_mut()[c.index] = END_POINT;
                        marked += 1;
                    }
                }

                if marked == 0 {
                    continue;
                }

                let data = volume.data_mut();
                let mut p = 0;
                while p < bucket.len() {
                    let c = bucket[p];
                    match c.state {
                        TO_BE_CHANGED => {
                            data[c.index] = match config.change {
                                ChangeDirection::ForegroundToBackground => VoxelState::Background as u8,
                                ChangeDirection::BackgroundToForeground => FOREGROUND,
                            };
                            removed_in_cycle += 1;
                            bucket.swap_remove(p);
                        }
                        END_POINT => {
                            if config.change == ChangeDirection::ForegroundToBackground {
                                data[c.index] = FOREGROUND;
                            }
                            ends_in_cycle += 1;
                            bucket.swap_remove(p);
                        }
                        _ => p += 1,
                    }
                }
            }

            let changed = removed_in_cycle + ends_in_cycle > 0;
            if changed {
                removed_in_bucket += removed_in_cycle;
                report.removed += removed_in_cycle;
                report.end_points += ends_in_cycle;
                cycle += 1;
                report.successful_iterations += 1;
            }
            report.iterations += 1;

            log::trace!(
                "bucket {} cycle {}: {} changed, {} end points, {} left",
                index,
                cycle,
                removed_in_cycle,
                ends_in_cycle,
                bucket.len()
            );

            if !(changed && within_bound(report.iterations)) {
                break;
            }
        }

        log::debug!(
            "bucket {} done after {} cycles, {} changed",
            index,
            cycle,
            removed_in_bucket
        );

        // changes may have made earlier buckets simple again
        if removed_in_bucket > 0 && sweep.is_after(index, first) {
            index = first;
        } else {
            index += sweep.step();
        }

        if !(sweep.contains(index) && within_bound(report.iterations)) {
            break;
        }
    }
}
