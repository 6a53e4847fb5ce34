//! Freehand stroke engine for the nib calligraphy tool
//!
//! This crate turns a stream of pointer samples into smooth path geometry:
//! - [`filter`] - Pen dynamics (mass, drag, nib angle) smoothing the input
//! - [`fit`] - Least-squares cubic Bezier fitting with recursive splitting
//! - [`curve`] - Appendable path command list
//! - [`accumulator`] - Line and calligraphic capture modes
//! - [`gesture`] - The tool state machine driven by input events
//! - [`host`] - Traits for the document, canvas, view and timers it drives
//! - [`types`] - kurbo geometry re-exports and path bounds

pub mod accumulator;
pub mod constants;
pub mod curve;
pub mod filter;
pub mod fit;
pub mod gesture;
pub mod host;
pub mod types;

pub use accumulator::*;
pub use constants::*;
pub use curve::*;
pub use filter::*;
pub use fit::*;
pub use gesture::*;
pub use host::*;
pub use types::*;
