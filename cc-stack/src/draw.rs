//! Issue the drawing commands for a stacked trend figure.

use crate::canvas::{
    AxesConfig, AxesId, Canvas, Color, HAlign, LineStyle, Mark, Tick, TextStyle, VAlign,
};
use crate::layout::{Layout, DPI, PIXELS_PER_PLOTLINE};
use crate::stack::{trend_linewidth, Layer, Stack, WINDOW_DAYS};
use crate::stack_list::{PctBounds, StackList};
use cc_data::TimeSeries;
use cc_utils::dates::{date_to_ordinal, ordinal_to_date};
use log::info;

const Z_BACKGROUND: i32 = 1;
const Z_GUIDES: i32 = 99;
const Z_LAYERS: i32 = 250;

/// Lines thicker than this are drawn as filled bands.
const BAND_THRESHOLD: f64 = 3.5;

/// Days between date labels on the last waveform.
const DATE_TICK_DAYS: i64 = 3;

fn rect_points(x0: f64, x1: f64, y0: f64, y1: f64) -> Vec<[f64; 2]> {
    vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]
}

fn series_points(series: &TimeSeries) -> Vec<[f64; 2]> {
    series
        .valid_points()
        .map(|(date, v)| [date_to_ordinal(&date) as f64, v])
        .collect()
}

/// Title-bar label: `cases_NYT` becomes `daily.cases [NYT]`.
fn daily_label(series_name: &str) -> String {
    match series_name.rsplit_once('_') {
        Some((stem, unit)) => format!("daily.{} [{}]", stem.to_lowercase().replace('_', "."), unit),
        None => format!("daily.{}", series_name.to_lowercase()),
    }
}

/// Draw one layer's marks at height `y`. Returns the smoothed point's
/// percent, which the stack's trend line runs through.
fn draw_layer<C: Canvas>(
    canvas: &mut C,
    ax: AxesId,
    layer: &Layer,
    y: f64,
    color: Color,
    linewidth: f64,
) -> Option<f64> {
    let (Some(min), Some(max)) = (layer.min_pct(), layer.max_pct()) else {
        canvas.draw(
            ax,
            Mark::Text {
                at: [0.0, y],
                text: "< omitted >".to_string(),
                style: TextStyle::new(HAlign::Left, VAlign::Center).color(color),
                z: Z_LAYERS,
            },
        );
        return layer.smooth_pct();
    };
    for point in &layer.points {
        let Some(pct) = point.pct else { continue };
        canvas.draw(
            ax,
            Mark::Marker {
                at: [pct, y],
                shape: point.kind.marker(),
                color,
                z: Z_LAYERS,
            },
        );
        let align = if pct == max {
            Some(HAlign::Left)
        } else if pct == min {
            Some(HAlign::Right)
        } else {
            None
        };
        if let Some(h_align) = align {
            canvas.draw(
                ax,
                Mark::Text {
                    at: [pct, y],
                    text: format!("  {:.1}%  ", pct),
                    style: TextStyle::new(h_align, VAlign::Center).color(color),
                    z: Z_LAYERS,
                },
            );
        }
    }
    if max != min {
        let mark = if linewidth < BAND_THRESHOLD {
            Mark::Line {
                points: vec![[min, y], [max, y]],
                color,
                width: linewidth,
                style: LineStyle::Solid,
                z: Z_LAYERS,
            }
        } else {
            Mark::Fill {
                points: rect_points(min, max, y - linewidth / 2.0, y + linewidth / 2.0),
                color,
                z: Z_LAYERS,
            }
        };
        canvas.draw(ax, mark);
    }
    layer.smooth_pct()
}

/// Draw a stack's label and layers downward from `y_top`. Returns the
/// height just below the stack's blank line.
fn draw_layers<C: Canvas>(
    canvas: &mut C,
    ax: AxesId,
    stack: &Stack,
    y_top: f64,
    denominator: f64,
) -> f64 {
    let x = stack.layers.first().map(Layer::midpoint_pct).unwrap_or(0.0);
    canvas.draw(
        ax,
        Mark::Text {
            at: [x, y_top],
            text: stack.label.clone(),
            style: TextStyle::new(HAlign::Center, VAlign::Center),
            z: 0,
        },
    );
    let linewidth = trend_linewidth(stack.mean_of_raw, denominator);
    let n = stack.layers.len() as f64;
    let mut y = y_top - PIXELS_PER_PLOTLINE;
    let mut trend = Vec::new();
    for (i, layer) in stack.layers.iter().enumerate() {
        // Older windows fade out.
        let color = Color::BLACK.with_alpha(1.0 - i as f64 / n);
        if let Some(pct) = draw_layer(canvas, ax, layer, y, color, linewidth) {
            trend.push([pct, y]);
        }
        y -= PIXELS_PER_PLOTLINE;
    }
    canvas.draw(
        ax,
        Mark::Line {
            points: trend,
            color: Color::BLUE,
            width: 1.0,
            style: LineStyle::Solid,
            z: 2,
        },
    );
    y - PIXELS_PER_PLOTLINE
}

/// Date labels every few days across `first..=last` day ordinals.
fn date_ticks(first: i64, last: i64) -> Vec<Tick> {
    let start = first + (DATE_TICK_DAYS - first.rem_euclid(DATE_TICK_DAYS)) % DATE_TICK_DAYS;
    (start..=last)
        .step_by(DATE_TICK_DAYS as usize)
        .filter_map(|ordinal| {
            ordinal_to_date(ordinal).map(|date| Tick {
                position: ordinal as f64,
                label: date.format("%d%b").to_string(),
            })
        })
        .collect()
}

/// Actual and projected values of one stack.
fn draw_waveform<C: Canvas>(canvas: &mut C, ax: AxesId, stack: &Stack) {
    let mut all_points: Vec<[f64; 2]> = Vec::new();
    for (width, series) in [1.0, 3.0].into_iter().zip(&stack.sources) {
        if !series.has_something_to_plot() {
            continue;
        }
        let points = series_points(series);
        all_points.extend(&points);
        canvas.draw(
            ax,
            Mark::Line {
                points,
                color: Color::BLACK,
                width,
                style: LineStyle::Solid,
                z: 2,
            },
        );
    }
    if let Some(recent) = stack.layers.first() {
        for (width, point) in [1.0, 3.0].into_iter().zip(&recent.points) {
            let Some(extrapolation) = &point.extrapolation else {
                continue;
            };
            let points = series_points(&extrapolation.series);
            all_points.extend(&points);
            if let Some(end) = points.last().copied() {
                canvas.draw(
                    ax,
                    Mark::Marker {
                        at: end,
                        shape: point.kind.marker(),
                        color: Color::BLACK,
                        z: 3,
                    },
                );
            }
            canvas.draw(
                ax,
                Mark::Line {
                    points,
                    color: Color::BLACK,
                    width,
                    style: LineStyle::Solid,
                    z: 2,
                },
            );
        }
    }

    let highest = stack.sources.first().and_then(|s| s.max());
    let auto_top = all_points.iter().map(|p| p[1]).reduce(f64::max).map(|m| m * 1.05);
    let y_limits = match (highest, auto_top) {
        (Some(h), Some(top)) if (2.5 * h).min(top).is_finite() => Some([0.0, (2.5 * h).min(top)]),
        _ => None,
    };
    let x_first = all_points.iter().map(|p| p[0]).reduce(f64::min);
    let x_last = all_points.iter().map(|p| p[0]).reduce(f64::max);
    let x_ticks = match (stack.is_last, x_first, x_last) {
        (true, Some(first), Some(last)) => date_ticks(first as i64, last as i64),
        _ => Vec::new(),
    };

    if let (Some(x), Some([lo, hi])) = (x_first, y_limits) {
        canvas.draw(
            ax,
            Mark::Text {
                at: [x, (lo + hi) / 2.0],
                text: format!(" \n\n{}", stack.series_label),
                style: TextStyle::new(HAlign::Center, VAlign::Center)
                    .color(Color::GREY)
                    .rotation(90.0),
                z: 0,
            },
        );
    }
    canvas.configure(
        ax,
        AxesConfig {
            y_limits,
            x_ticks: Some(x_ticks),
            x_tick_rotation: if stack.is_last { 45.0 } else { 0.0 },
            y_ticks_right: true,
            legend: Some(stack.label.clone()),
            ..AxesConfig::default()
        },
    );
}

/// Draw the whole figure for `stacks` onto `canvas`.
///
/// `dataset_when` is shown in the subtitle.
pub fn draw_stacks<C: Canvas>(
    canvas: &mut C,
    stacks: &StackList,
    series_name: &str,
    dataset_when: &str,
) {
    let PctBounds {
        view_min,
        view_max,
        ticks,
        ..
    } = stacks.pct_bounds();
    let denominator = stacks.series_denominator();
    let layout = Layout::new(stacks.n_plotlines());
    let (y0, y9) = (layout.y0, layout.y9);

    canvas.set_size_inches(layout.fig_width, layout.fig_height, DPI);
    let ax = canvas.add_axes(layout.ax_position);
    canvas.draw(
        ax,
        Mark::Fill {
            points: rect_points(view_min, 0.0, y0, y9),
            color: Color::HALVING_ZONE,
            z: Z_BACKGROUND,
        },
    );
    canvas.draw(
        ax,
        Mark::Fill {
            points: rect_points(view_max, 0.0, y0, y9),
            color: Color::DOUBLING_ZONE,
            z: Z_BACKGROUND,
        },
    );

    let mut y_top = layout.y_top;
    for stack in &stacks.stacks {
        info!("Stacker plot for: {}", stack.label);
        for tick in &ticks {
            canvas.draw(
                ax,
                Mark::Text {
                    at: [tick.pct, y_top + PIXELS_PER_PLOTLINE],
                    text: format!("{}d", tick.days.abs() as i64),
                    style: TextStyle::new(HAlign::Center, VAlign::Center),
                    z: Z_GUIDES,
                },
            );
        }
        let y_bot = draw_layers(canvas, ax, stack, y_top, denominator);
        let solo = canvas.add_axes(layout.solo_position(y_top, y_bot));
        draw_waveform(canvas, solo, stack);
        y_top = y_bot;
    }

    for tick in &ticks {
        canvas.draw(
            ax,
            Mark::Line {
                points: vec![[tick.pct, y0], [tick.pct, y9]],
                color: Color::BLACK,
                width: 0.5,
                style: LineStyle::Dotted,
                z: Z_GUIDES,
            },
        );
    }
    canvas.draw(
        ax,
        Mark::Text {
            at: [view_min, y9],
            text: "Halving time (days)\n ".to_string(),
            style: TextStyle::new(HAlign::Left, VAlign::Bottom),
            z: Z_GUIDES,
        },
    );
    canvas.draw(
        ax,
        Mark::Text {
            at: [view_max, y9],
            text: "Doubling time (days)\n ".to_string(),
            style: TextStyle::new(HAlign::Right, VAlign::Bottom),
            z: Z_GUIDES,
        },
    );
    canvas.configure(
        ax,
        AxesConfig {
            x_limits: Some([view_min, view_max]),
            y_limits: Some([y0, y9]),
            x_label: Some("% Daily Change".to_string()),
            y_label: Some("Best = As far left as possible".to_string()),
            y_ticks: Some(Vec::new()),
            y_grid: true,
            ..AxesConfig::default()
        },
    );

    let bar = canvas.add_axes(layout.bar_position);
    canvas.configure(
        bar,
        AxesConfig {
            hidden: true,
            x_limits: Some([0.0, 1.0]),
            y_limits: Some([0.0, 1.0]),
            ..AxesConfig::default()
        },
    );
    canvas.draw(
        bar,
        Mark::Fill {
            points: rect_points(0.0, 1.0, 0.0, 1.0),
            color: Color::YELLOW,
            z: 0,
        },
    );
    canvas.draw(
        bar,
        Mark::Text {
            at: [0.5, 0.5],
            text: daily_label(series_name),
            style: TextStyle::new(HAlign::Center, VAlign::Center).font_size(14.0),
            z: 1,
        },
    );
    canvas.figure_text(
        [0.5, layout.bar_position.bottom],
        &format!(
            "{}-day Trend Fits -- Dataset of: {} --   \u{25a0}=raw data trend     \u{25cb}=smoothed data trend\nTesting volume not considered",
            WINDOW_DAYS, dataset_when
        ),
        TextStyle::new(HAlign::Center, VAlign::Top)
            .color(Color::GREY)
            .font_size(13.0),
    );
}
