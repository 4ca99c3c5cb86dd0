//! Linear and exponential trend fits over a trailing window.
//!
//! Day offsets are measured from the first date of the window, so the fitted
//! intercept is the value at that date. Projected dates continue the window's
//! calendar one day at a time.

use crate::{
    error::{FitError, Result},
    time_series::{DataPoint, TimeSeries},
};
use cc_utils::dates::{date_to_ordinal, ordinal_to_date};
use chrono::NaiveDate;
use log::debug;
use serde::Serialize;
use std::f64::consts::LN_2;

/// Minimum non-null points for a linear fit.
pub const MIN_POINTS_LINEAR: usize = 2;

/// Minimum non-null points for an exponential fit.
pub const MIN_POINTS_EXPONENTIAL: usize = 3;

const MAX_ITERATIONS: usize = 600;
const RELATIVE_TOLERANCE: f64 = 1.49012e-8;
const FLAT_RATE: f64 = 1e-12;

/// Parameters of a fitted trend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Fit {
    /// `value = slope * t + intercept`
    Linear { slope: f64, intercept: f64 },
    /// `value = a * exp(rate * t) - shift`
    Exponential {
        a: f64,
        rate: f64,
        shift: f64,
        doubling_days: f64,
        halving_days: f64,
    },
}

impl Fit {
    pub fn slope(&self) -> Option<f64> {
        match self {
            Fit::Linear { slope, .. } => Some(*slope),
            Fit::Exponential { .. } => None,
        }
    }

    pub fn doubling_days(&self) -> Option<f64> {
        match self {
            Fit::Exponential { doubling_days, .. } => Some(*doubling_days),
            Fit::Linear { .. } => None,
        }
    }

    pub fn halving_days(&self) -> Option<f64> {
        match self {
            Fit::Exponential { halving_days, .. } => Some(*halving_days),
            Fit::Linear { .. } => None,
        }
    }

    fn evaluate(&self, t: f64) -> f64 {
        match *self {
            Fit::Linear { slope, intercept } => slope * t + intercept,
            Fit::Exponential { a, rate, shift, .. } => a * (rate * t).exp() - shift,
        }
    }
}

/// A fitted projection: the back window and `days_forward` future dates,
/// valued by the fitted curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extrapolation {
    pub series: TimeSeries,
    pub fit: Fit,
}

/// Ordinary least squares of `y` against `x`; returns `(slope, intercept)`.
fn least_squares_line(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let (sxy, sxx) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
            let dx = x - mean_x;
            (sxy + dx * (y - mean_y), sxx + dx * dx)
        });
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

fn sum_squares(a: f64, rate: f64, ts: &[f64], ys: &[f64]) -> f64 {
    ts.iter()
        .zip(ys)
        .map(|(t, y)| {
            let r = a * (rate * t).exp() - y;
            r * r
        })
        .sum()
}

/// Levenberg-Marquardt refinement of `a * exp(rate * t)` against `ys`.
fn refine_exponential(ts: &[f64], ys: &[f64], a0: f64, rate0: f64) -> Result<(f64, f64)> {
    let (mut a, mut rate) = (a0, rate0);
    let mut sse = sum_squares(a, rate, ts, ys);
    if !sse.is_finite() {
        return Err(FitError::FitDidNotConverge(
            "initial estimate overflows".to_string(),
        ));
    }
    let scale: f64 = ys.iter().map(|y| y * y).sum::<f64>().max(f64::MIN_POSITIVE);
    let mut lambda = 1e-3;

    for iteration in 0..MAX_ITERATIONS {
        if sse <= scale * 1e-24 {
            return Ok((a, rate));
        }
        let (mut jaa, mut jab, mut jbb, mut ga, mut gb) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for (t, y) in ts.iter().zip(ys) {
            let e = (rate * t).exp();
            let da = e;
            let db = a * t * e;
            let r = a * e - y;
            jaa += da * da;
            jab += da * db;
            jbb += db * db;
            ga += da * r;
            gb += db * r;
        }
        let m_aa = jaa * (1.0 + lambda);
        let m_bb = jbb * (1.0 + lambda);
        let det = m_aa * m_bb - jab * jab;
        if det == 0.0 || !det.is_finite() {
            lambda *= 10.0;
            continue;
        }
        let step_a = (-ga * m_bb + gb * jab) / det;
        let step_rate = (-gb * m_aa + ga * jab) / det;
        let step_is_small = step_a.abs() <= RELATIVE_TOLERANCE * (a.abs() + RELATIVE_TOLERANCE)
            && step_rate.abs() <= RELATIVE_TOLERANCE * (rate.abs() + RELATIVE_TOLERANCE);

        let candidate = sum_squares(a + step_a, rate + step_rate, ts, ys);
        if candidate.is_finite() && candidate < sse {
            a += step_a;
            rate += step_rate;
            let improvement = sse - candidate;
            sse = candidate;
            lambda = (lambda / 10.0).max(1e-12);
            if step_is_small || improvement <= RELATIVE_TOLERANCE * sse {
                debug!("exponential fit converged after {} iterations", iteration + 1);
                return Ok((a, rate));
            }
        } else {
            if step_is_small {
                return Ok((a, rate));
            }
            lambda *= 10.0;
            if lambda > 1e16 {
                break;
            }
        }
    }
    Err(FitError::FitDidNotConverge(format!(
        "no convergence within {} iterations",
        MAX_ITERATIONS
    )))
}

/// Fit a trend over the trailing `days_back + 1` points of `series` and
/// project it `days_forward` days past the window.
///
/// The exponential fit shifts the window so its minimum is 1 when any value is
/// not positive, uses a log-linear fit of the shifted values as the starting
/// point, then refines `a * exp(rate * t)` against the unshifted values. The
/// projection subtracts the shift back out.
pub fn fit_and_project(
    series: &TimeSeries,
    days_back: usize,
    days_forward: usize,
    exponential: bool,
) -> Result<Extrapolation> {
    let window = series.tail(days_back + 1);
    let needed = if exponential {
        MIN_POINTS_EXPONENTIAL
    } else {
        MIN_POINTS_LINEAR
    };
    let base_date = window.first_date().ok_or(FitError::InsufficientData {
        needed,
        found: 0,
    })?;
    let base_ordinal = date_to_ordinal(&base_date);

    let (ts, ys): (Vec<f64>, Vec<f64>) = window
        .valid_points()
        .map(|(date, v)| ((date_to_ordinal(&date) - base_ordinal) as f64, v))
        .unzip();
    if ys.len() < needed {
        return Err(FitError::InsufficientData {
            needed,
            found: ys.len(),
        });
    }

    let fit = if exponential {
        let min = ys.iter().copied().fold(f64::INFINITY, f64::min);
        let shift = if min <= 0.0 { 1.0 - min } else { 0.0 };
        let logged = ys.iter().map(|y| (y + shift).ln()).collect::<Vec<_>>();
        let (rate0, intercept0) = least_squares_line(&ts, &logged).ok_or_else(|| {
            FitError::FitDidNotConverge("window spans a single day".to_string())
        })?;
        let (a, rate) = refine_exponential(&ts, &ys, intercept0.exp(), rate0)?;
        if !a.is_finite() || !rate.is_finite() || rate.abs() < FLAT_RATE {
            return Err(FitError::FitDidNotConverge(format!(
                "degenerate rate {} for {}",
                rate, series.geo_name
            )));
        }
        Fit::Exponential {
            a,
            rate,
            shift,
            doubling_days: LN_2 / rate,
            halving_days: 0.5f64.ln() / rate,
        }
    } else {
        let (slope, intercept) = least_squares_line(&ts, &ys)
            .ok_or(FitError::InsufficientData { needed, found: 1 })?;
        Fit::Linear { slope, intercept }
    };

    let last_ordinal = window
        .last_date()
        .map(|d| date_to_ordinal(&d))
        .unwrap_or(base_ordinal);
    let dates: Vec<NaiveDate> = window
        .points
        .iter()
        .map(|p| p.date)
        .chain((1..=days_forward as i64).filter_map(|k| ordinal_to_date(last_ordinal + k)))
        .collect();
    let points = dates
        .into_iter()
        .map(|date| {
            let t = (date_to_ordinal(&date) - base_ordinal) as f64;
            DataPoint::new(date, fit.evaluate(t))
        })
        .collect();

    Ok(Extrapolation {
        series: TimeSeries {
            series_name: series.series_name.clone(),
            geo_name: series.geo_name.clone(),
            points,
        },
        fit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2020, 4, 1).unwrap();
        let points = values
            .iter()
            .enumerate()
            .map(|(i, v)| DataPoint::new(start + chrono::Duration::days(i as i64), *v))
            .collect();
        TimeSeries::new("cases_NYT", "Bexar", points)
    }

    #[test]
    fn test_exponential_recovers_doubling_time() {
        let ts = series(&[100.0, 200.0, 400.0, 800.0]);
        let result = fit_and_project(&ts, 3, 5, true).unwrap();
        let doubling = result.fit.doubling_days().unwrap();
        assert!((doubling - 1.0).abs() < 1e-6, "doubling {}", doubling);
        assert!((result.fit.halving_days().unwrap() + 1.0).abs() < 1e-6);
        let last = result.series.points.last().unwrap().value.unwrap();
        assert!((last - 800.0 * 32.0).abs() / (800.0 * 32.0) < 1e-6);
    }

    #[test]
    fn test_exponential_decline_has_negative_doubling() {
        let ts = series(&[800.0, 400.0, 200.0, 100.0]);
        let fit = fit_and_project(&ts, 3, 0, true).unwrap().fit;
        assert!((fit.halving_days().unwrap() - 1.0).abs() < 1e-6);
        assert!(fit.doubling_days().unwrap() < 0.0);
    }

    #[test]
    fn test_linear_recovers_slope() {
        let ts = series(&[10.0, 20.0, 30.0, 40.0]);
        let result = fit_and_project(&ts, 3, 2, false).unwrap();
        assert!((result.fit.slope().unwrap() - 10.0).abs() < 1e-9);
        let values: Vec<f64> = result.series.points.iter().filter_map(|p| p.value).collect();
        assert_eq!(values.len(), 6);
        assert!((values[5] - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection_dates_are_contiguous() {
        let ts = series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let result = fit_and_project(&ts, 3, 4, false).unwrap();
        let dates: Vec<NaiveDate> = result.series.points.iter().map(|p| p.date).collect();
        assert_eq!(dates.len(), 8);
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2020, 4, 3).unwrap());
        for pair in dates.windows(2) {
            assert_eq!((pair[1] - pair[0]).num_days(), 1);
        }
    }

    #[test]
    fn test_window_is_trailing() {
        // A jump early in the series must not influence a two-day window.
        let ts = series(&[1000.0, 1.0, 2.0, 3.0]);
        let fit = fit_and_project(&ts, 2, 0, false).unwrap().fit;
        assert!((fit.slope().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_points_are_reported() {
        let ts = series(&[1.0, 2.0]);
        assert_eq!(
            fit_and_project(&ts, 5, 1, true).unwrap_err(),
            FitError::InsufficientData {
                needed: 3,
                found: 2
            }
        );
        assert!(fit_and_project(&series(&[1.0]), 3, 1, false).is_err());
        assert!(fit_and_project(&series(&[]), 3, 1, false).is_err());
    }

    #[test]
    fn test_missing_values_are_skipped() {
        let mut ts = series(&[100.0, 200.0, 400.0, 800.0]);
        ts.points.insert(
            0,
            DataPoint::missing(NaiveDate::from_ymd_opt(2020, 3, 31).unwrap()),
        );
        ts.points[2].value = None;
        let fit = fit_and_project(&ts, 4, 0, true).unwrap().fit;
        assert!((fit.doubling_days().unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_positive_values_are_shifted() {
        let ts = series(&[0.0, 1.0, 3.0, 7.0, 15.0]);
        let result = fit_and_project(&ts, 4, 1, true).unwrap();
        match result.fit {
            Fit::Exponential { shift, rate, .. } => {
                assert_eq!(shift, 1.0);
                assert!(rate > 0.0);
            }
            other => panic!("unexpected fit {:?}", other),
        }
    }

    #[test]
    fn test_flat_series_does_not_converge() {
        let ts = series(&[5.0, 5.0, 5.0, 5.0]);
        assert!(matches!(
            fit_and_project(&ts, 3, 1, true),
            Err(FitError::FitDidNotConverge(_))
        ));
    }
}
