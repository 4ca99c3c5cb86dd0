//! Per-geography trend summaries.
//!
//! A [`Stack`] holds one [`Layer`] per trailing window offset, most recent
//! first. Each layer has one [`Point`] per input series (raw, then smoothed),
//! and each point is the percent daily change of an exponential fit over that
//! window.

use crate::canvas::MarkerShape;
use cc_data::{Extrapolation, TimeSeries};
use log::{debug, info};
use serde::Serialize;
use std::f64::consts::LN_2;

/// `100 * ln 2`: converts doubling days to percent daily change and back.
pub const LN2_X100: f64 = 100.0 * LN_2;

/// Window offsets per stack.
pub const N_WINDOWS: usize = 7;

/// Days per fitting window.
pub const WINDOW_DAYS: usize = 14;

/// Days each point's fit is projected forward.
pub const FORWARD_DAYS: usize = 5;

/// Span of the smoothed companion series.
pub const SMOOTH_SPAN: usize = 7;

/// Days of history kept when a series is loaded for plotting.
pub const LEFT_TIME: usize = 45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Raw,
    Smooth,
}

impl PointKind {
    pub fn marker(&self) -> MarkerShape {
        match self {
            PointKind::Raw => MarkerShape::Square,
            PointKind::Smooth => MarkerShape::Circle,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Point {
    pub kind: PointKind,
    pub series: TimeSeries,
    pub extrapolation: Option<Extrapolation>,
    pub doubling_days: Option<f64>,
    /// Percent daily change; `None` when the window could not be fitted.
    pub pct: Option<f64>,
}

impl Point {
    pub fn new(kind: PointKind, series: TimeSeries) -> Self {
        let mut point = Point {
            kind,
            series,
            extrapolation: None,
            doubling_days: None,
            pct: None,
        };
        // Two points cannot pin down a two-parameter model.
        if point.series.len() > 2 {
            let back = point.series.len() - 1;
            match point.series.extrapolate(back, FORWARD_DAYS, true) {
                Ok(extrapolation) => {
                    let doubling = extrapolation.fit.doubling_days();
                    point.pct = doubling.map(|d| if d == 0.0 { 0.0 } else { LN2_X100 / d });
                    point.doubling_days = doubling;
                    point.extrapolation = Some(extrapolation);
                }
                Err(e) => debug!("{} {:?}: {}", point.series.geo_name, kind, e),
            }
        }
        point
    }
}

#[derive(Debug, Clone)]
pub struct Layer {
    pub points: Vec<Point>,
    /// Point percents, without missing or zero values.
    pub pcts: Vec<f64>,
}

impl Layer {
    pub fn new(series: Vec<TimeSeries>) -> Self {
        let points: Vec<Point> = series
            .into_iter()
            .zip([PointKind::Raw, PointKind::Smooth])
            .map(|(s, kind)| Point::new(kind, s))
            .collect();
        let pcts = points
            .iter()
            .filter_map(|p| p.pct)
            .filter(|p| *p != 0.0)
            .collect();
        Layer { points, pcts }
    }

    pub fn min_pct(&self) -> Option<f64> {
        self.pcts.iter().copied().reduce(f64::min)
    }

    pub fn max_pct(&self) -> Option<f64> {
        self.pcts.iter().copied().reduce(f64::max)
    }

    pub fn midpoint_pct(&self) -> f64 {
        match (self.min_pct(), self.max_pct()) {
            (Some(min), Some(max)) => (min + max) / 2.0,
            _ => 0.0,
        }
    }

    /// Percent of the smoothed point, when there is exactly one.
    pub fn smooth_pct(&self) -> Option<f64> {
        let smooth: Vec<f64> = self
            .points
            .iter()
            .filter(|p| p.kind == PointKind::Smooth)
            .filter_map(|p| p.pct)
            .collect();
        match smooth.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

/// Trend summary of one geography.
#[derive(Debug, Clone)]
pub struct Stack {
    pub label: String,
    /// Label of the plotted series, e.g. `daily.cases [NYT]`.
    pub series_label: String,
    /// Raw series first, then the smoothed one when present.
    pub sources: Vec<TimeSeries>,
    pub layers: Vec<Layer>,
    /// Plot lines taken: label, one per layer and a blank line.
    pub n_plotlines: usize,
    pub mean_of_raw: f64,
    pub is_last: bool,
}

impl Stack {
    /// Build from a daily series and, optionally, its smoothed form.
    pub fn new(window: usize, raw: TimeSeries, smooth: Option<TimeSeries>) -> Self {
        info!("Stacker calc for: {}", raw.geo_name);
        let label = raw.geo_name.clone();
        let series_label = raw.display_label();
        let mean_of_raw = raw.mean().unwrap_or(0.0);
        let sources: Vec<TimeSeries> = std::iter::once(raw).chain(smooth).collect();
        let layers: Vec<Layer> = (window..window + N_WINDOWS)
            .map(|i| {
                let start = -(i as isize);
                let end = start + window as isize;
                Layer::new(sources.iter().map(|s| s.subseq(start, end)).collect())
            })
            .collect();
        Stack {
            label,
            series_label,
            mean_of_raw,
            n_plotlines: 2 + layers.len(),
            sources,
            layers,
            is_last: false,
        }
    }

    /// Stack for a cumulative series: its daily differences plus their
    /// smoothed form.
    pub fn from_cumulative(cumulative: &TimeSeries) -> Self {
        let daily = cumulative.diff();
        let smooth = daily.smooth(SMOOTH_SPAN);
        Stack::new(WINDOW_DAYS, daily, Some(smooth))
    }

    /// Widen `(min, max)` to cover every layer percent.
    pub fn pct_range(&self, min: f64, max: f64) -> (f64, f64) {
        self.layers
            .iter()
            .flat_map(|l| l.pcts.iter())
            .fold((min, max), |(lo, hi), p| (lo.min(*p), hi.max(*p)))
    }
}

/// Width of a stack's trend bands: its mean relative to the mean across
/// stacks, clamped to `[0.5, 15.5]`.
pub fn trend_linewidth(mean_of_raw: f64, denominator: f64) -> f64 {
    let width = 17.5 * mean_of_raw / denominator;
    if width.is_nan() {
        return 0.5;
    }
    width.clamp(0.5, 15.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_data::DataPoint;
    use chrono::NaiveDate;

    fn series(name: &str, values: impl IntoIterator<Item = f64>) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let points = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| DataPoint::new(start + chrono::Duration::days(i as i64), v))
            .collect();
        TimeSeries::new(name, "Bexar", points)
    }

    #[test]
    fn test_point_pct_from_doubling() {
        // Daily values doubling every 5 days.
        let s = series("daily_cases_NYT", (0..14).map(|i| 100.0 * 2f64.powf(i as f64 / 5.0)));
        let point = Point::new(PointKind::Raw, s);
        let pct = point.pct.unwrap();
        assert!((point.doubling_days.unwrap() - 5.0).abs() < 1e-4);
        assert!((pct - LN2_X100 / 5.0).abs() < 1e-3);
        let extrapolation = point.extrapolation.unwrap();
        assert_eq!(extrapolation.series.len(), 14 + FORWARD_DAYS);
    }

    #[test]
    fn test_short_or_flat_points_have_no_pct() {
        assert!(Point::new(PointKind::Raw, series("x_A", [1.0, 2.0])).pct.is_none());
        assert!(Point::new(PointKind::Raw, series("x_A", [3.0; 6])).pct.is_none());
    }

    #[test]
    fn test_layer_drops_missing_pcts() {
        let growing = series("x_A", (0..14).map(|i| 10.0 * 1.1f64.powi(i)));
        let flat = series("x_A", [3.0; 14]);
        let layer = Layer::new(vec![growing, flat]);
        assert_eq!(layer.points.len(), 2);
        assert_eq!(layer.pcts.len(), 1);
        assert_eq!(layer.min_pct(), layer.max_pct());
        assert_eq!(layer.smooth_pct(), None);
        assert!((layer.midpoint_pct() - layer.pcts[0]).abs() < 1e-12);
    }

    #[test]
    fn test_stack_from_cumulative() {
        let cumulative = series(
            "cases_NYT",
            (0..45).map(|i| 1000.0 * 1.05f64.powi(i)),
        );
        let stack = Stack::from_cumulative(&cumulative);
        assert_eq!(stack.layers.len(), N_WINDOWS);
        assert_eq!(stack.n_plotlines, 9);
        assert_eq!(stack.series_label, "daily.cases [NYT]");
        assert_eq!(stack.sources[1].series_name, "smooth_daily_cases_NYT");
        // Most recent window first.
        assert_eq!(
            stack.layers[0].points[0].series.last_date(),
            cumulative.last_date()
        );
        assert_eq!(stack.layers[1].points[0].series.len(), WINDOW_DAYS);
        for layer in &stack.layers {
            let raw = layer.points[0].pct.unwrap();
            assert!((raw - 100.0 * 1.05f64.ln()).abs() < 1e-3, "pct {}", raw);
        }
        let (lo, hi) = stack.pct_range(9e9, -9e9);
        assert!(lo <= hi);
    }

    #[test]
    fn test_linewidth_is_clamped() {
        assert_eq!(trend_linewidth(1.0, 1.0), 15.5);
        assert!((trend_linewidth(1.0, 3.5) - 5.0).abs() < 1e-12);
        assert_eq!(trend_linewidth(0.0, 10.0), 0.5);
        assert_eq!(trend_linewidth(0.0, 0.0), 0.5);
        assert_eq!(trend_linewidth(100.0, 1.0), 15.5);
    }
}
