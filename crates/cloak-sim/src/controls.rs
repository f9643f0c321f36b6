use cloak_core::input::{Intent, Key, KeyEvent};
use serde::{Deserialize, Serialize};

/// Keyboard bindings for the five intent flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardControls {
    pub left: Key,
    pub right: Key,
    pub up: Key,
    pub down: Key,
    pub jump: Key,
}

impl Default for KeyboardControls {
    fn default() -> Self {
        Self {
            left: Key::Left,
            right: Key::Right,
            up: Key::Up,
            down: Key::Down,
            jump: Key::Space,
        }
    }
}

impl KeyboardControls {
    /// Apply a key event to `intent`: press sets the bound flag, release
    /// clears it. Returns whether the key was bound.
    pub fn apply(&self, intent: &mut Intent, event: KeyEvent) -> bool {
        let (key, held) = match event {
            KeyEvent::Pressed(key, _) => (key, true),
            KeyEvent::Released(key, _) => (key, false),
        };
        let flag = if key == self.left {
            &mut intent.left
        } else if key == self.right {
            &mut intent.right
        } else if key == self.up {
            &mut intent.up
        } else if key == self.down {
            &mut intent.down
        } else if key == self.jump {
            &mut intent.jump
        } else {
            return false;
        };
        *flag = held;
        true
    }
}

#[cfg(test)]
mod tests {
    use cloak_core::test_helpers::{press, release};

    use super::*;

    #[test]
    fn press_and_release_toggle_flags() {
        let controls = KeyboardControls::default();
        let mut intent = Intent::default();
        assert!(controls.apply(&mut intent, press(Key::Right)));
        assert!(controls.apply(&mut intent, press(Key::Space)));
        assert!(intent.right && intent.jump);
        assert!(controls.apply(&mut intent, release(Key::Right)));
        assert!(!intent.right && intent.jump);
    }

    #[test]
    fn unbound_keys_are_ignored() {
        let controls = KeyboardControls::default();
        let mut intent = Intent::default();
        assert!(!controls.apply(&mut intent, press(Key::Other(42))));
        assert!(!controls.apply(&mut intent, press(Key::Escape)));
        assert_eq!(intent, Intent::default());
    }

    #[test]
    fn rebinding() {
        let controls = KeyboardControls {
            jump: Key::Up,
            up: Key::Other(1),
            ..KeyboardControls::default()
        };
        let mut intent = Intent::default();
        controls.apply(&mut intent, press(Key::Up));
        assert!(intent.jump);
        assert!(!intent.up);
    }
}
