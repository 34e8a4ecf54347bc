use crate::frame::Frame;
use crate::intent::Key;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown(Key),
    KeyUp(Key),
    Quit,
}

/// Window the operator looks at and types into.
pub trait Display {
    /// Drains every event queued since the previous call. Never blocks.
    fn poll_events(&mut self) -> Vec<InputEvent>;

    fn render(&mut self, frame: &Frame);

    /// Called once after the loop finished.
    fn close(&mut self) {}
}
