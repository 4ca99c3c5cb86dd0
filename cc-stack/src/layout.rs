//! Figure geometry for a list of stacks.
//!
//! The left half of the figure is one tall axes holding every stack's layers,
//! in plot-line units of [`PIXELS_PER_PLOTLINE`]. The right half holds one
//! waveform axes per stack, aligned with that stack's rows.

use crate::canvas::Rect;

pub const PIXELS_PER_PLOTLINE: f64 = 20.0;
pub const DPI: f64 = 100.0;

const LEFT_FIGURE_INCHES: f64 = 6.0;
const RIGHT_FIGURE_INCHES: f64 = 6.0;
const LEFT_MARGIN: f64 = 0.3;
const RIGHT_MARGIN: f64 = 0.53;
const TOP_MARGIN: f64 = 1.15;
const BOTTOM_MARGIN: f64 = 0.53;
const TITLE_BAR_INCHES: f64 = 0.29;

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub y0: f64,
    /// Top row of the first stack.
    pub y_top: f64,
    /// Upper limit of the layer axes.
    pub y9: f64,
    pub fig_width: f64,
    pub fig_height: f64,
    pub ax_height: f64,
    pub ax_position: Rect,
    pub solo_left: f64,
    pub solo_width: f64,
    pub bar_position: Rect,
}

impl Layout {
    pub fn new(n_plotlines: usize) -> Self {
        let y0 = 0.0;
        // The blank line under the last stack is not drawn.
        let y_top = n_plotlines.saturating_sub(1) as f64 * PIXELS_PER_PLOTLINE;
        let y9 = y_top + 0.5 * PIXELS_PER_PLOTLINE;
        let ax_height = (y9 - y0) / DPI;
        let fig_width = LEFT_FIGURE_INCHES + RIGHT_FIGURE_INCHES;
        let fig_height = TOP_MARGIN + ax_height + BOTTOM_MARGIN;
        let ax_position = Rect {
            left: LEFT_MARGIN / fig_width,
            bottom: BOTTOM_MARGIN / fig_height,
            width: (LEFT_FIGURE_INCHES - LEFT_MARGIN) / fig_width,
            height: (fig_height - TOP_MARGIN - BOTTOM_MARGIN) / fig_height,
        };
        let solo_left = ax_position.left + ax_position.width;
        let solo_width = 1.0 - solo_left - RIGHT_MARGIN / fig_width;
        let bar_bottom = (fig_height - TITLE_BAR_INCHES) / fig_height;
        Layout {
            y0,
            y_top,
            y9,
            fig_width,
            fig_height,
            ax_height,
            ax_position,
            solo_left,
            solo_width,
            bar_position: Rect {
                left: 0.0,
                bottom: bar_bottom,
                width: 1.0,
                height: 1.0 - bar_bottom,
            },
        }
    }

    /// Inches above the figure bottom of layer-axes height `y`. Without the
    /// bottom margin this converts a height difference.
    pub fn y_to_inches(&self, y: f64, with_margin: bool) -> f64 {
        let margin = if with_margin { BOTTOM_MARGIN } else { 0.0 };
        margin + self.ax_height * (y - self.y0) / (self.y9 - self.y0)
    }

    /// Position of the waveform axes for the stack spanning `y_bot..y_top`.
    pub fn solo_position(&self, y_top: f64, y_bot: f64) -> Rect {
        Rect {
            left: self.solo_left,
            bottom: self.y_to_inches(y_bot + PIXELS_PER_PLOTLINE, true) / self.fig_height,
            width: self.solo_width,
            height: self.y_to_inches(y_top - y_bot, false) / self.fig_height,
        }
    }
}
