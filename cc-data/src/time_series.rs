use crate::extrapolate::{fit_and_project, Extrapolation};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// A single dated value. `None` marks a missing observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl DataPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        DataPoint {
            date,
            value: Some(value),
        }
    }

    pub fn missing(date: NaiveDate) -> Self {
        DataPoint { date, value: None }
    }
}

/// A date-ordered numeric sequence for one series and one geography.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    /// Internal series name, e.g. `cases_NYT` or `daily_cases_NYT`.
    pub series_name: String,
    /// Label of the geography this series belongs to.
    pub geo_name: String,
    pub points: Vec<DataPoint>,
}

/// Resolve a Python-style slice bound against `len`.
fn slice_bound(index: isize, len: usize) -> usize {
    if index < 0 {
        len.saturating_sub(index.unsigned_abs())
    } else {
        (index as usize).min(len)
    }
}

impl TimeSeries {
    /// Build a series, sorting points by date.
    pub fn new(series_name: &str, geo_name: &str, mut points: Vec<DataPoint>) -> Self {
        points.sort_by_key(|p| p.date);
        TimeSeries {
            series_name: series_name.to_string(),
            geo_name: geo_name.to_string(),
            points,
        }
    }

    /// Same metadata, different points.
    fn derive(&self, series_name: String, points: Vec<DataPoint>) -> Self {
        TimeSeries {
            series_name,
            geo_name: self.geo_name.clone(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points that carry a value.
    pub fn valid_points(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points
            .iter()
            .filter_map(|p| p.value.filter(|v| v.is_finite()).map(|v| (p.date, v)))
    }

    pub fn has_something_to_plot(&self) -> bool {
        self.valid_points().next().is_some()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// The last point that carries a value.
    pub fn last_valid(&self) -> Option<(NaiveDate, f64)> {
        self.valid_points().last()
    }

    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .valid_points()
            .fold((0.0, 0usize), |(sum, count), (_, v)| (sum + v, count + 1));
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    pub fn max(&self) -> Option<f64> {
        self.valid_points().map(|(_, v)| v).reduce(f64::max)
    }

    pub fn min(&self) -> Option<f64> {
        self.valid_points().map(|(_, v)| v).reduce(f64::min)
    }

    /// The trailing `n` points.
    pub fn tail(&self, n: usize) -> Self {
        let start = self.len().saturating_sub(n);
        self.derive(self.series_name.clone(), self.points[start..].to_vec())
    }

    /// Day-over-day difference. The first point has no predecessor and is
    /// missing, as is any point next to a missing one.
    pub fn diff(&self) -> Self {
        let mut points = Vec::with_capacity(self.len());
        let mut previous: Option<f64> = None;
        for (i, point) in self.points.iter().enumerate() {
            let value = match (i, previous, point.value) {
                (0, _, _) => None,
                (_, Some(prev), Some(cur)) => Some(cur - prev),
                _ => None,
            };
            points.push(DataPoint {
                date: point.date,
                value,
            });
            previous = point.value;
        }
        self.derive(format!("daily_{}", self.series_name), points)
    }

    /// Exponentially weighted moving average over `span` points, with weights
    /// normalised over the observations seen so far. Missing observations keep
    /// their position in the decay.
    pub fn smooth(&self, span: usize) -> Self {
        let alpha = 2.0 / (span as f64 + 1.0);
        let decay = 1.0 - alpha;
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        let points = self
            .points
            .iter()
            .map(|point| {
                numerator *= decay;
                denominator *= decay;
                if let Some(v) = point.value.filter(|v| v.is_finite()) {
                    numerator += v;
                    denominator += 1.0;
                }
                DataPoint {
                    date: point.date,
                    value: (denominator > 0.0).then(|| numerator / denominator),
                }
            })
            .collect();
        self.derive(format!("smooth_{}", self.series_name), points)
    }

    /// `numerator / self`, aligned by date. Dates where either side is missing
    /// or the quotient is not finite are dropped.
    pub fn as_denominator(&self, numerator: &TimeSeries) -> Self {
        let numerators: BTreeMap<NaiveDate, f64> = numerator.valid_points().collect();
        let points = self
            .valid_points()
            .filter_map(|(date, denom)| {
                let quotient = numerators.get(&date)? / denom;
                quotient.is_finite().then(|| DataPoint::new(date, quotient))
            })
            .collect();
        self.derive(format!("quotient_{}", self.series_name), points)
    }

    /// Slice with Python semantics: negative bounds count from the end, and an
    /// end bound of zero means "through the last point".
    pub fn subseq(&self, start: isize, end: isize) -> Self {
        let len = self.len();
        let from = slice_bound(start, len);
        let to = if end == 0 { len } else { slice_bound(end, len) };
        let points = if from < to {
            self.points[from..to].to_vec()
        } else {
            Vec::new()
        };
        self.derive(self.series_name.clone(), points)
    }

    /// Fit a trend over the trailing `days_back + 1` points and project it
    /// `days_forward` days.
    pub fn extrapolate(
        &self,
        days_back: usize,
        days_forward: usize,
        exponential: bool,
    ) -> crate::Result<Extrapolation> {
        fit_and_project(self, days_back, days_forward, exponential)
    }

    /// Display label: `daily_cases_NYT` becomes `daily.cases [NYT]`.
    pub fn display_label(&self) -> String {
        match self.series_name.rsplit_once('_') {
            Some((stem, unit)) => {
                format!("{} [{}]", stem.to_lowercase().replace('_', "."), unit)
            }
            None => self.series_name.to_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 4, d).unwrap()
    }

    fn series(values: &[Option<f64>]) -> TimeSeries {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, v)| DataPoint {
                date: day(i as u32 + 1),
                value: *v,
            })
            .collect();
        TimeSeries::new("cases_NYT", "Bexar", points)
    }

    fn values(ts: &TimeSeries) -> Vec<Option<f64>> {
        ts.points.iter().map(|p| p.value).collect()
    }

    #[test]
    fn test_diff_marks_first_point_missing() {
        let ts = series(&[Some(1.0), Some(3.0), None, Some(10.0), Some(12.0)]);
        let d = ts.diff();
        assert_eq!(d.series_name, "daily_cases_NYT");
        assert_eq!(values(&d), vec![None, Some(2.0), None, None, Some(2.0)]);
        // original untouched
        assert_eq!(ts.points[1].value, Some(3.0));
    }

    #[test]
    fn test_smooth_matches_adjusted_ewm() {
        let ts = series(&[Some(1.0), Some(2.0), Some(3.0)]);
        let s = ts.smooth(3);
        // alpha = 0.5: weights 1, 0.5, 0.25
        let v = values(&s);
        assert_eq!(v[0], Some(1.0));
        assert!((v[1].unwrap() - (2.0 + 0.5) / 1.5).abs() < 1e-12);
        assert!((v[2].unwrap() - (3.0 + 1.0 + 0.25) / 1.75).abs() < 1e-12);
        assert_eq!(s.series_name, "smooth_cases_NYT");
    }

    #[test]
    fn test_smooth_carries_through_gaps() {
        let ts = series(&[None, Some(4.0), None, Some(4.0)]);
        let v = values(&ts.smooth(7));
        assert_eq!(v[0], None);
        assert_eq!(v[1], Some(4.0));
        assert_eq!(v[2], Some(4.0));
        assert_eq!(v[3], Some(4.0));
    }

    #[test]
    fn test_subseq_follows_python_slicing() {
        let ts = series(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]);
        assert_eq!(values(&ts.subseq(-2, 0)), vec![Some(4.0), Some(5.0)]);
        assert_eq!(values(&ts.subseq(-4, -2)), vec![Some(2.0), Some(3.0)]);
        assert_eq!(values(&ts.subseq(-9, -3)), vec![Some(1.0), Some(2.0)]);
        assert!(ts.subseq(-1, -3).is_empty());
        assert_eq!(ts.subseq(1, 3).len(), 2);
    }

    #[test]
    fn test_as_denominator_drops_infinite() {
        let denom = series(&[Some(2.0), Some(0.0), Some(4.0)]);
        let numer = series(&[Some(1.0), Some(1.0), None]);
        let q = denom.as_denominator(&numer);
        assert_eq!(q.series_name, "quotient_cases_NYT");
        assert_eq!(q.points, vec![DataPoint::new(day(1), 0.5)]);
    }

    #[test]
    fn test_summary_statistics_skip_missing() {
        let ts = series(&[Some(2.0), None, Some(6.0)]);
        assert_eq!(ts.mean(), Some(4.0));
        assert_eq!(ts.max(), Some(6.0));
        assert_eq!(ts.min(), Some(2.0));
        assert_eq!(ts.tail(2).len(), 2);
        assert_eq!(ts.last_valid(), Some((day(3), 6.0)));
        assert!(series(&[None]).mean().is_none());
    }

    #[test]
    fn test_display_label_splits_unit() {
        let ts = series(&[Some(1.0)]).diff();
        assert_eq!(ts.display_label(), "daily.cases [NYT]");
    }
}
