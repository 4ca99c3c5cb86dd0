//! A [`Canvas`] that records commands into a serializable [`Figure`].

use crate::canvas::{AxesConfig, AxesId, Canvas, Mark, Rect, TextStyle};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FigureAxes {
    pub position: Rect,
    pub config: AxesConfig,
    pub marks: Vec<Mark>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FigureText {
    pub at: [f64; 2],
    pub text: String,
    pub style: TextStyle,
}

/// Complete description of a drawn figure.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Figure {
    pub width_inches: f64,
    pub height_inches: f64,
    pub dpi: f64,
    pub axes: Vec<FigureAxes>,
    pub texts: Vec<FigureText>,
}

impl Figure {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Every text mark on every axes, in drawing order.
    pub fn text_marks(&self) -> impl Iterator<Item = &str> {
        self.axes.iter().flat_map(|a| {
            a.marks.iter().filter_map(|m| match m {
                Mark::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
        })
    }
}

#[derive(Debug, Default)]
pub struct FigureRecorder {
    figure: Figure,
}

impl FigureRecorder {
    pub fn new() -> Self {
        FigureRecorder::default()
    }

    pub fn into_figure(self) -> Figure {
        self.figure
    }
}

impl Canvas for FigureRecorder {
    fn set_size_inches(&mut self, width: f64, height: f64, dpi: f64) {
        self.figure.width_inches = width;
        self.figure.height_inches = height;
        self.figure.dpi = dpi;
    }

    fn add_axes(&mut self, position: Rect) -> AxesId {
        self.figure.axes.push(FigureAxes {
            position,
            config: AxesConfig::default(),
            marks: Vec::new(),
        });
        self.figure.axes.len() - 1
    }

    fn configure(&mut self, axes: AxesId, config: AxesConfig) {
        if let Some(a) = self.figure.axes.get_mut(axes) {
            a.config = config;
        }
    }

    fn draw(&mut self, axes: AxesId, mark: Mark) {
        if let Some(a) = self.figure.axes.get_mut(axes) {
            a.marks.push(mark);
        }
    }

    fn figure_text(&mut self, at: [f64; 2], text: &str, style: TextStyle) {
        self.figure.texts.push(FigureText {
            at,
            text: text.to_string(),
            style,
        });
    }
}
