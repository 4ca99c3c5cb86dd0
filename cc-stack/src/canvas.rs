//! Drawing surface the layout engine issues commands to.
//!
//! Coordinates of marks are in the data space of the axes they are drawn on.
//! Axes positions are fractions of the figure, `(0, 0)` at the bottom left.

use serde::Serialize;

pub type AxesId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Color { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Color { a, ..self }
    }

    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const GREY: Color = Color::rgb(0.5, 0.5, 0.5);
    pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);
    /// `#bbffbb`, background of the halving side of the percent axis.
    pub const HALVING_ZONE: Color = Color::rgb(0.733, 1.0, 0.733);
    /// `#ff7f7f`, background of the doubling side of the percent axis.
    pub const DOUBLING_ZONE: Color = Color::rgb(1.0, 0.498, 0.498);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub left: f64,
    pub bottom: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VAlign {
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerShape {
    Square,
    Circle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    Solid,
    Dotted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextStyle {
    pub h_align: HAlign,
    pub v_align: VAlign,
    pub color: Color,
    pub font_size: Option<f64>,
    pub rotation: f64,
}

impl TextStyle {
    pub fn new(h_align: HAlign, v_align: VAlign) -> Self {
        TextStyle {
            h_align,
            v_align,
            color: Color::BLACK,
            font_size: None,
            rotation: 0.0,
        }
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }
}

/// One drawing command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Mark {
    Line {
        points: Vec<[f64; 2]>,
        color: Color,
        width: f64,
        style: LineStyle,
        z: i32,
    },
    Fill {
        points: Vec<[f64; 2]>,
        color: Color,
        z: i32,
    },
    Marker {
        at: [f64; 2],
        shape: MarkerShape,
        color: Color,
        z: i32,
    },
    Text {
        at: [f64; 2],
        text: String,
        style: TextStyle,
        z: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub position: f64,
    pub label: String,
}

/// Axis settings. `None` ticks leave the choice to the renderer; an empty
/// list hides them.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AxesConfig {
    pub hidden: bool,
    pub x_limits: Option<[f64; 2]>,
    pub y_limits: Option<[f64; 2]>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub x_ticks: Option<Vec<Tick>>,
    pub y_ticks: Option<Vec<Tick>>,
    pub x_tick_rotation: f64,
    pub y_ticks_right: bool,
    pub y_grid: bool,
    pub legend: Option<String>,
}

pub trait Canvas {
    fn set_size_inches(&mut self, width: f64, height: f64, dpi: f64);

    fn add_axes(&mut self, position: Rect) -> AxesId;

    fn configure(&mut self, axes: AxesId, config: AxesConfig);

    fn draw(&mut self, axes: AxesId, mark: Mark);

    /// Text placed in figure coordinates rather than on an axes.
    fn figure_text(&mut self, at: [f64; 2], text: &str, style: TextStyle);
}
