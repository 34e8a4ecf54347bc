use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc, RwLock,
};

use teleop::{Display, Frame, InputEvent, Rotation};

/// Most recent rendered frame, tagged so the window uploads it only once.
#[derive(Debug, Default)]
pub struct SharedFrame {
    pub generation: u64,
    pub frame: Option<Frame>,
}

/// Control-loop side of the window: reads queued input and publishes
/// frames for the UI thread.
pub struct ChannelDisplay {
    events_rx: mpsc::Receiver<InputEvent>,
    latest: Arc<RwLock<SharedFrame>>,
    finished: Arc<AtomicBool>,
    rotation: Rotation,
}

/// UI side of the window.
#[derive(Clone)]
pub struct DisplayHandle {
    pub events_tx: mpsc::Sender<InputEvent>,
    pub latest: Arc<RwLock<SharedFrame>>,
    finished: Arc<AtomicBool>,
}

impl DisplayHandle {
    /// True once the control loop finished its shutdown sequence.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn send(&self, event: InputEvent) {
        // the loop has already stopped if the receiver is gone
        let _ = self.events_tx.send(event);
    }
}

pub fn channel_display(rotation: Rotation) -> (ChannelDisplay, DisplayHandle) {
    let (events_tx, events_rx) = mpsc::channel();
    let latest = Arc::new(RwLock::new(SharedFrame::default()));
    let finished = Arc::new(AtomicBool::new(false));
    (
        ChannelDisplay {
            events_rx,
            latest: latest.clone(),
            finished: finished.clone(),
            rotation,
        },
        DisplayHandle {
            events_tx,
            latest,
            finished,
        },
    )
}

impl Display for ChannelDisplay {
    fn poll_events(&mut self) -> Vec<InputEvent> {
        self.events_rx.try_iter().collect()
    }

    fn render(&mut self, frame: &Frame) {
        let rotated = frame.rotated(self.rotation);
        if let Ok(mut latest) = self.latest.write() {
            latest.generation += 1;
            latest.frame = Some(rotated);
        }
    }

    fn close(&mut self) {
        self.finished.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use teleop::Key;

    use super::*;

    #[test]
    fn test_poll_drains_queue() {
        let (mut display, handle) = channel_display(Rotation::Deg0);
        handle.send(InputEvent::KeyDown(Key::T));
        handle.send(InputEvent::KeyUp(Key::T));

        assert_eq!(
            display.poll_events(),
            vec![InputEvent::KeyDown(Key::T), InputEvent::KeyUp(Key::T)]
        );
        assert!(display.poll_events().is_empty(), "Queue is drained fully");
    }

    #[test]
    fn test_render_publishes_rotated_frame() {
        let (mut display, handle) = channel_display(Rotation::Deg270);
        let frame = Frame::new(2, 1, vec![255, 0, 0, 0, 255, 0]).unwrap();
        display.render(&frame);
        display.render(&frame);

        let latest = handle.latest.read().unwrap();
        assert_eq!(latest.generation, 2);
        let shown = latest.frame.as_ref().unwrap();
        assert_eq!((shown.width(), shown.height()), (1, 2));
        assert_eq!(shown.pixel(0, 0), [255, 0, 0]);
    }

    #[test]
    fn test_close_marks_finished() {
        let (mut display, handle) = channel_display(Rotation::Deg0);
        assert!(!handle.is_finished());
        display.close();
        assert!(handle.is_finished());
    }
}
