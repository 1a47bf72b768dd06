//! Hysteresis classification of per-frame measurements.
//!
//! Raw per-frame thresholding is noisy while a part enters or leaves the
//! field of view and under segmentation jitter, so a single out-of-range
//! frame must never flag a part. The classifier requires a sustained run of
//! one verdict before flipping, and confirms at most one defect per tracked
//! part.

use crate::data::{AssemblyInfo, PartRect};

/// Candidates narrower than this are segmentation noise, not parts.
const MIN_PART_WIDTH: i32 = 30;

/// A run counter must exceed this before the sustained verdict flips, so
/// the eleventh consecutive frame of one verdict is the deciding one.
const CONFIRM_RUN: u32 = 10;

/// The single chosen candidate for one frame, or empty when the belt is
/// clear.
#[derive(Clone, Copy, Debug, Default)]
pub struct Measurement {
    pub area: i32,
    pub rect: PartRect,
}

impl Measurement {
    /// An empty measurement: nothing usable in the frame.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.area == 0
    }

    /// Pick the candidate to measure: the largest box that sits fully
    /// inside the frame's horizontal bounds and is wide enough to be a
    /// part rather than noise.
    pub fn select(candidates: &[PartRect], frame_width: i32) -> Self {
        let mut best = Measurement::empty();
        for rect in candidates {
            let area = rect.area();
            if area > best.area
                && rect.x > 0
                && rect.x + rect.width < frame_width
                && rect.width > MIN_PART_WIDTH
            {
                best = Measurement { area, rect: *rect };
            }
        }
        best
    }
}

/// Per-part hysteresis state machine.
///
/// Three states fall out of the fields: Idle (`part_seen` false),
/// Tracking-OK (`part_seen` true, `part_defective` false), and
/// Tracking-Defect (`part_defective` true, sticky until the part leaves
/// the field of view).
pub struct Classifier {
    min_area: i32,
    max_area: i32,
    part_seen: bool,
    part_defective: bool,
    ok_run: u32,
    defect_run: u32,
}

impl Classifier {
    pub fn new(min_area: i32, max_area: i32) -> Self {
        Self {
            min_area,
            max_area,
            part_seen: false,
            part_defective: false,
            ok_run: 0,
            defect_run: 0,
        }
    }

    /// Fold one frame's measurement into the hysteresis state and emit the
    /// resulting status record. `defect` and `inc_total` on the returned
    /// info are edge-triggered: true only on the frame where the transition
    /// happened.
    pub fn observe(&mut self, m: Measurement) -> AssemblyInfo {
        if m.is_empty() {
            // Empty belt: forget the previous part entirely.
            self.part_seen = false;
            self.part_defective = false;
            self.ok_run = 0;
            self.defect_run = 0;
            return AssemblyInfo::default();
        }

        let frame_defect = m.area > self.max_area || m.area < self.min_area;
        if frame_defect {
            self.defect_run += 1;
        } else {
            self.ok_run += 1;
        }

        let mut defect = false;
        let mut inc_total = false;
        if !self.part_seen {
            // A part just entered the field of view. It is counted now;
            // defect confirmation starts from the next frame.
            self.part_seen = true;
            inc_total = true;
        } else {
            // Sustained OK evidence clears accumulated defect evidence.
            if !frame_defect && self.ok_run > CONFIRM_RUN {
                self.defect_run = 0;
            }
            // Sustained defect evidence confirms the part defective, once.
            if frame_defect && self.defect_run > CONFIRM_RUN {
                if !self.part_defective {
                    self.part_defective = true;
                    defect = true;
                }
                self.ok_run = 0;
            }
        }

        AssemblyInfo {
            defect,
            show: self.part_defective,
            area: m.area,
            rect: m.rect,
            inc_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(area: i32) -> Measurement {
        Measurement {
            area,
            rect: PartRect::new(10, 10, 100, 100),
        }
    }

    /// Run an area sequence through a fresh classifier with the default
    /// range and collect the emitted infos.
    fn run(areas: &[i32]) -> Vec<AssemblyInfo> {
        let mut classifier = Classifier::new(20_000, 30_000);
        areas.iter().map(|&a| classifier.observe(m(a))).collect()
    }

    fn parts(infos: &[AssemblyInfo]) -> usize {
        infos.iter().filter(|i| i.inc_total).count()
    }

    fn defects(infos: &[AssemblyInfo]) -> usize {
        infos.iter().filter(|i| i.defect).count()
    }

    #[test]
    fn one_part_is_counted_once_per_nonzero_run() {
        let mut areas = vec![0, 0];
        areas.extend([25_000; 20]);
        let infos = run(&areas);
        assert_eq!(parts(&infos), 1);
        assert!(infos[2].inc_total, "counted on the first nonzero frame");
        assert_eq!(defects(&infos), 0);
    }

    #[test]
    fn a_gap_in_the_belt_starts_a_new_part() {
        let mut areas = Vec::new();
        areas.extend([25_000; 5]);
        areas.push(0);
        areas.extend([25_000; 5]);
        let infos = run(&areas);
        assert_eq!(parts(&infos), 2);
    }

    #[test]
    fn empty_measurement_resets_everything_immediately() {
        let mut areas = vec![15_000; 15]; // confirmed defective by now
        areas.push(0);
        let infos = run(&areas);
        let last = infos.last().unwrap();
        assert!(!last.show);
        assert!(!last.defect);
        assert_eq!(last.area, 0);
        assert_eq!(last.rect, PartRect::default());
        assert!(!last.inc_total);
    }

    #[test]
    fn a_single_bad_frame_never_flips_the_verdict() {
        let mut areas = Vec::new();
        areas.extend([25_000; 12]);
        areas.push(35_000);
        areas.extend([25_000; 12]);
        let infos = run(&areas);
        assert_eq!(defects(&infos), 0);
        assert!(infos.iter().all(|i| !i.show));
    }

    #[test]
    fn defect_confirmed_on_the_eleventh_bad_frame() {
        // Part enters already out of range: the first frame counts toward
        // the run, confirmation lands on frame 11.
        let infos = run(&[15_000; 15]);
        assert_eq!(parts(&infos), 1);
        assert_eq!(defects(&infos), 1);
        assert!(!infos[9].defect);
        assert!(infos[10].defect, "edge fires on the 11th frame");
        assert!(!infos[11].defect, "edge fires only once");
        assert!(infos[10..].iter().all(|i| i.show), "verdict is sticky");
    }

    #[test]
    fn confirmed_defect_is_sticky_but_counted_once() {
        // The concrete scenario from the acceptance checklist: OK run,
        // oversized run, OK run again.
        let mut areas = vec![0, 0];
        areas.extend([25_000; 12]);
        areas.extend([35_000; 12]);
        areas.extend([25_000; 12]);
        let infos = run(&areas);

        assert_eq!(parts(&infos), 1);
        assert_eq!(defects(&infos), 1);

        // Confirmation on the 11th oversized frame (index 2 + 12 + 10).
        let edge = infos.iter().position(|i| i.defect).unwrap();
        assert_eq!(edge, 24);
        // Sticky through the trailing OK run.
        assert!(infos[edge..].iter().all(|i| i.show));
    }

    #[test]
    fn sustained_ok_clears_defect_evidence() {
        // Ten bad frames, an OK break (with ok_run already sustained), ten
        // more bad frames: no confirmation, the evidence was cleared. One
        // more consecutive bad frame after a fresh run of eleven confirms.
        let mut areas = Vec::new();
        areas.extend([25_000; 12]);
        areas.extend([35_000; 10]);
        areas.push(25_000);
        areas.extend([35_000; 10]);
        let infos = run(&areas);
        assert_eq!(defects(&infos), 0);

        areas.push(35_000);
        let infos = run(&areas);
        assert_eq!(defects(&infos), 1, "eleventh consecutive bad frame confirms");
    }

    #[test]
    fn short_ok_breaks_do_not_clear_defect_evidence() {
        // Without a sustained OK run the defect evidence keeps
        // accumulating across interleaved good frames.
        let mut areas = Vec::new();
        areas.extend([25_000; 2]);
        areas.extend([35_000; 6]);
        areas.push(25_000); // ok_run only reaches 3, no clearing
        areas.extend([35_000; 5]);
        let infos = run(&areas);
        assert_eq!(defects(&infos), 1);
    }

    #[test]
    fn first_frame_of_a_part_never_confirms() {
        let infos = run(&[15_000]);
        assert_eq!(parts(&infos), 1);
        assert_eq!(defects(&infos), 0);
        assert!(!infos[0].show);
    }

    #[test]
    fn area_always_tracks_the_latest_measurement() {
        let infos = run(&[0, 25_000, 35_000, 0]);
        let areas: Vec<i32> = infos.iter().map(|i| i.area).collect();
        assert_eq!(areas, vec![0, 25_000, 35_000, 0]);
    }

    #[test]
    fn selection_picks_the_largest_contained_candidate() {
        let candidates = [
            PartRect::new(10, 10, 100, 100),
            PartRect::new(200, 10, 150, 150),
            PartRect::new(400, 10, 50, 50),
        ];
        let chosen = Measurement::select(&candidates, 960);
        assert_eq!(chosen.rect, candidates[1]);
        assert_eq!(chosen.area, 150 * 150);
    }

    #[test]
    fn selection_rejects_boxes_touching_the_frame_edges() {
        let left_edge = PartRect::new(0, 10, 100, 100);
        let right_edge = PartRect::new(860, 10, 100, 100);
        assert!(Measurement::select(&[left_edge], 960).is_empty());
        assert!(Measurement::select(&[right_edge], 960).is_empty());
    }

    #[test]
    fn selection_rejects_narrow_noise() {
        let sliver = PartRect::new(100, 10, 30, 400);
        assert!(Measurement::select(&[sliver], 960).is_empty());
    }

    #[test]
    fn no_candidates_is_an_empty_measurement() {
        assert!(Measurement::select(&[], 960).is_empty());
    }
}
