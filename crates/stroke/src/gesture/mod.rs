//! Gesture handling: pointer and key events in, committed strokes out

mod tool;

pub use tool::DynaDrawTool;

use bitflags::bitflags;

use crate::host::ToolContext;
use crate::types::Point;

bitflags! {
    /// Pointer buttons held during a motion event
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct ButtonMask: u8 {
        const BUTTON1 = 1 << 0;
        const BUTTON2 = 1 << 1;
        const BUTTON3 = 1 << 2;
    }
}

/// Where a tool is in its gesture lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    /// Button held, samples are being collected
    Capturing,
    /// A fit pass is running over the sample window
    Fitting,
    /// The finished stroke is being written to the document
    Committing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Up,
    Down,
    Left,
    Right,
    Escape,
    Other(u32),
}

/// Input delivered by the windowing layer (points in desktop coordinates)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Begin {
        point: Point,
        time_ms: u64,
        button: u8,
    },
    Move {
        point: Point,
        time_ms: u64,
        buttons: ButtonMask,
    },
    End {
        point: Point,
        time_ms: u64,
        button: u8,
    },
    Key {
        code: KeyCode,
    },
}

/// A drawing tool driven by input events
pub trait ToolGesture {
    /// Handle one input event; returns whether the tool consumed it
    fn handle_event(&mut self, ctx: &mut ToolContext<'_>, event: &InputEvent) -> bool;

    /// Periodic sampling tick while a timer started by the tool is running
    fn on_timer(&mut self, ctx: &mut ToolContext<'_>) -> bool;

    /// Abandon any gesture in flight; safe to call repeatedly
    fn cancel(&mut self, ctx: &mut ToolContext<'_>);

    fn state(&self) -> GestureState;
}
