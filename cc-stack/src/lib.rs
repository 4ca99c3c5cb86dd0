//! Stacked comparative trend layout.
//!
//! Each geography becomes a [`Stack`] of trend fits over sliding windows.
//! A [`StackList`] shares one percent-change axis across its stacks, and
//! [`draw_stacks`] issues the figure to any [`Canvas`]. [`FigureRecorder`]
//! is a canvas that keeps the commands as a serializable [`Figure`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use cc_stack::{draw_stacks, FigureRecorder, Stack, StackList};
//! # fn series() -> cc_data::TimeSeries { unimplemented!() }
//!
//! let stacks = StackList::new(vec![Stack::from_cumulative(&series())]);
//! let mut recorder = FigureRecorder::new();
//! draw_stacks(&mut recorder, &stacks, "cases_NYT", "02May20 12:52");
//! let json = recorder.into_figure().to_json().unwrap();
//! ```

pub mod canvas;
pub mod draw;
pub mod figure;
pub mod layout;
pub mod stack;
pub mod stack_list;

pub use canvas::{AxesConfig, AxesId, Canvas, Color, Mark, MarkerShape, Rect, TextStyle};
pub use draw::draw_stacks;
pub use figure::{Figure, FigureRecorder};
pub use layout::Layout;
pub use stack::{Layer, Point, PointKind, Stack, LEFT_TIME, WINDOW_DAYS};
pub use stack_list::{PctBounds, PctTick, StackList};
