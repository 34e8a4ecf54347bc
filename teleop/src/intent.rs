/// Operator meaning of an input, independent of the key that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MoveForward,
    MoveBackward,
    YawLeft,
    YawRight,
    TakeOff,
    Land,
    Quit,
}

impl Intent {
    pub fn is_movement(self) -> bool {
        !matches!(self, Intent::TakeOff | Intent::Land | Intent::Quit)
    }
}

/// Raw keys the display reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    T,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Escape,
    Other,
}

#[derive(Debug, Clone)]
pub struct KeyMap {
    bindings: Vec<(Key, Intent)>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            bindings: vec![
                (Key::W, Intent::MoveUp),
                (Key::S, Intent::MoveDown),
                (Key::A, Intent::YawLeft),
                (Key::D, Intent::YawRight),
                (Key::ArrowLeft, Intent::MoveLeft),
                (Key::ArrowRight, Intent::MoveRight),
                (Key::ArrowUp, Intent::MoveForward),
                (Key::ArrowDown, Intent::MoveBackward),
                (Key::T, Intent::TakeOff),
                (Key::Q, Intent::Land),
                (Key::Escape, Intent::Quit),
            ],
        }
    }
}

impl KeyMap {
    pub fn new(bindings: Vec<(Key, Intent)>) -> Self {
        KeyMap { bindings }
    }

    pub fn intent(&self, key: Key) -> Option<Intent> {
        self.bindings
            .iter()
            .find(|(bound, _)| *bound == key)
            .map(|(_, intent)| *intent)
    }
}

/// Intents currently held down, in the order they were pressed.
#[derive(Debug, Default, Clone)]
pub struct HeldIntents {
    held: Vec<Intent>,
}

impl HeldIntents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true on the press edge, false if the intent was already held.
    pub fn press(&mut self, intent: Intent) -> bool {
        if self.held.contains(&intent) {
            return false;
        }
        self.held.push(intent);
        true
    }

    pub fn release(&mut self, intent: Intent) {
        self.held.retain(|&held| held != intent);
    }

    pub fn contains(&self, intent: Intent) -> bool {
        self.held.contains(&intent)
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Oldest press first.
    pub fn iter(&self) -> impl Iterator<Item = Intent> + '_ {
        self.held.iter().copied()
    }
}

impl FromIterator<Intent> for HeldIntents {
    fn from_iter<I: IntoIterator<Item = Intent>>(iter: I) -> Self {
        let mut held = HeldIntents::new();
        for intent in iter {
            held.press(intent);
        }
        held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let map = KeyMap::default();
        assert_eq!(map.intent(Key::W), Some(Intent::MoveUp));
        assert_eq!(map.intent(Key::A), Some(Intent::YawLeft));
        assert_eq!(map.intent(Key::ArrowUp), Some(Intent::MoveForward));
        assert_eq!(map.intent(Key::T), Some(Intent::TakeOff));
        assert_eq!(map.intent(Key::Q), Some(Intent::Land));
        assert_eq!(map.intent(Key::Other), None, "Unbound keys map to nothing");
    }

    #[test]
    fn test_press_reports_edges_only() {
        let mut held = HeldIntents::new();
        assert!(held.press(Intent::TakeOff), "First press is an edge");
        assert!(!held.press(Intent::TakeOff), "Repeated press is not an edge");
        held.release(Intent::TakeOff);
        assert!(held.press(Intent::TakeOff), "Press after release is an edge again");
    }

    #[test]
    fn test_press_order_is_kept() {
        let mut held: HeldIntents = [Intent::MoveUp, Intent::YawLeft, Intent::MoveDown]
            .into_iter()
            .collect();
        held.release(Intent::YawLeft);
        let order: Vec<_> = held.iter().collect();
        assert_eq!(order, vec![Intent::MoveUp, Intent::MoveDown]);
    }
}
