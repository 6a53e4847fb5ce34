//! Retained scene graph for nib
//!
//! Nodes live in a generation-checked arena and are addressed by [`NodeId`]:
//! - [`graph`] - The graph, dirty-flag propagation and the update scheduler
//! - [`node`] - Node kinds, styles and reference bookkeeping
//! - [`flags`] - Dirty bits
//! - [`observer`] - Callbacks for modified/released notifications
//! - [`document`] - Adapter letting the stroke tool commit into the graph
//! - [`headless`] - Canvas, view and timers for running without a window

pub mod arena;
pub mod document;
pub mod error;
pub mod flags;
pub mod graph;
pub mod headless;
pub mod node;
pub mod observer;

pub use arena::*;
pub use document::*;
pub use error::*;
pub use flags::*;
pub use graph::*;
pub use headless::*;
pub use node::*;
pub use observer::*;
