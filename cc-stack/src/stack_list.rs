use crate::stack::{Stack, LN2_X100};
use serde::Serialize;

/// Furthest percent shown on either side of zero.
pub const PCT_LIMIT: f64 = 40.0;

/// Smallest extent of each zone, so both colors are always visible.
pub const PCT_FLOOR: f64 = 0.001;

/// Approximate number of ticks on the percent axis.
pub const TICKS_PER_AXIS: f64 = 11.0;

/// A tick on the percent axis, placed where a whole number of days lands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PctTick {
    pub pct: f64,
    /// Doubling time in days, negative for halving.
    pub days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PctBounds {
    /// Clamped range of the data.
    pub min: f64,
    pub max: f64,
    /// Axis limits: the data range plus a fifth of it on each side.
    pub view_min: f64,
    pub view_max: f64,
    pub ticks: Vec<PctTick>,
}

fn pct_to_days(pct: f64) -> f64 {
    if pct == 0.0 {
        0.0
    } else {
        LN2_X100 / pct
    }
}

fn days_to_pct(days: f64) -> f64 {
    if days == 0.0 {
        0.0
    } else {
        LN2_X100 / days
    }
}

/// `start, start + step, ...` up to but excluding `stop`.
fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let n = ((stop - start) / step).ceil();
    if !n.is_finite() || n <= 0.0 {
        return Vec::new();
    }
    (0..n as usize).map(|k| start + k as f64 * step).collect()
}

/// The stacks of one figure, in drawing order. The last one carries the
/// date axis.
#[derive(Debug, Clone)]
pub struct StackList {
    pub stacks: Vec<Stack>,
}

impl StackList {
    pub fn new(mut stacks: Vec<Stack>) -> Self {
        if let Some(last) = stacks.last_mut() {
            last.is_last = true;
        }
        StackList { stacks }
    }

    pub fn n_plotlines(&self) -> usize {
        self.stacks.iter().map(|s| s.n_plotlines).sum()
    }

    /// Mean across stacks of each stack's raw mean.
    pub fn series_denominator(&self) -> f64 {
        if self.stacks.is_empty() {
            return 0.0;
        }
        self.stacks.iter().map(|s| s.mean_of_raw).sum::<f64>() / self.stacks.len() as f64
    }

    pub fn pct_bounds(&self) -> PctBounds {
        let (lo, hi) = self
            .stacks
            .iter()
            .fold((9e9, -9e9), |(lo, hi), s| s.pct_range(lo, hi));
        pct_bounds_for(lo, hi)
    }
}

/// Axis bounds and ticks for data spanning `lo..hi` percent.
pub fn pct_bounds_for(lo: f64, hi: f64) -> PctBounds {
    let min = lo.min(-PCT_FLOOR).max(-PCT_LIMIT);
    let max = hi.max(PCT_FLOOR).min(PCT_LIMIT);
    let range = max - min;
    let view_min = min - range / 5.0;
    let view_max = max + range / 5.0;

    let step = range / TICKS_PER_AXIS;
    let pcts = if view_min * view_max > 0.0 {
        arange(min, max, step)
    } else {
        // Walk out from zero in both directions so zero itself is not a tick.
        let mut below: Vec<f64> = arange(-step, min - step, -step);
        below.extend(arange(step, max + step, step));
        below
    };
    let ticks = pcts
        .into_iter()
        .map(|p| {
            let days = pct_to_days(p).round();
            PctTick {
                pct: days_to_pct(days),
                days,
            }
        })
        .collect();
    PctBounds {
        min,
        max,
        view_min,
        view_max,
        ticks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::Layer;

    fn stack_with_pcts(label: &str, pcts: &[f64]) -> Stack {
        Stack {
            label: label.to_string(),
            series_label: "daily_cases_NYT".to_string(),
            sources: Vec::new(),
            layers: vec![Layer {
                points: Vec::new(),
                pcts: pcts.to_vec(),
            }],
            n_plotlines: 3,
            mean_of_raw: 1.0,
            is_last: false,
        }
    }

    #[test]
    fn test_bounds_include_both_zones() {
        let b = pct_bounds_for(-5.0, 3.0);
        assert_eq!((b.min, b.max), (-5.0, 3.0));
        assert!((b.view_min + 6.6).abs() < 1e-12);
        assert!((b.view_max - 4.6).abs() < 1e-12);

        let b = pct_bounds_for(0.0005, 0.0005);
        assert_eq!((b.min, b.max), (-PCT_FLOOR, 0.0005f64.max(PCT_FLOOR)));

        let b = pct_bounds_for(-80.0, 120.0);
        assert_eq!((b.min, b.max), (-40.0, 40.0));
        assert!((b.view_min + 56.0).abs() < 1e-12);
    }

    #[test]
    fn test_ticks_land_on_whole_days() {
        let b = pct_bounds_for(-5.0, 3.0);
        // Seven ticks below zero and five above.
        assert_eq!(b.ticks.iter().filter(|t| t.pct < 0.0).count(), 7);
        assert_eq!(b.ticks.iter().filter(|t| t.pct > 0.0).count(), 5);
        for tick in &b.ticks {
            assert_eq!(tick.days, tick.days.round());
            assert!((tick.pct * tick.days - LN2_X100).abs() < 1e-9);
        }
        // 100 ln2 / (8/11) = 95.3 days
        assert_eq!(b.ticks[0].days, -95.0);
        assert!((b.ticks[0].pct - LN2_X100 / -95.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_converts_to_zero() {
        assert_eq!(pct_to_days(0.0), 0.0);
        assert_eq!(days_to_pct(0.0), 0.0);
        assert!((days_to_pct(pct_to_days(7.0)) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_list_bounds_span_every_stack() {
        let list = StackList::new(vec![
            stack_with_pcts("Texas", &[-5.0, 0.0005]),
            stack_with_pcts("Ohio", &[3.0]),
        ]);
        let b = list.pct_bounds();
        assert_eq!((b.min, b.max), (-5.0, 3.0));
        assert!((b.view_min + 6.6).abs() < 1e-12);
        assert!((b.view_max - 4.6).abs() < 1e-12);
        assert_eq!(b.ticks.len(), 12);
        assert!(b.ticks.iter().all(|t| t.pct > b.view_min && t.pct < b.view_max));
    }

    #[test]
    fn test_list_bounds_clamp_and_floor_together() {
        let list = StackList::new(vec![
            stack_with_pcts("Texas", &[0.0005, 3.0]),
            stack_with_pcts("Ohio", &[120.0]),
        ]);
        let b = list.pct_bounds();
        assert_eq!((b.min, b.max), (-PCT_FLOOR, PCT_LIMIT));
        let range = PCT_LIMIT + PCT_FLOOR;
        assert!((b.view_min - (-PCT_FLOOR - range / 5.0)).abs() < 1e-12);
        assert!((b.view_max - (PCT_LIMIT + range / 5.0)).abs() < 1e-12);
        // One halving tick fits in the floor zone, eleven doubling ticks above.
        assert_eq!(b.ticks.iter().filter(|t| t.pct < 0.0).count(), 1);
        assert_eq!(b.ticks.iter().filter(|t| t.pct > 0.0).count(), 11);
        assert_eq!(b.ticks[0].days, -19.0);
    }

    #[test]
    fn test_empty_list_has_floor_bounds() {
        let list = StackList::new(Vec::new());
        let b = list.pct_bounds();
        assert_eq!((b.min, b.max), (-PCT_FLOOR, PCT_FLOOR));
        assert_eq!(list.series_denominator(), 0.0);
    }
}
