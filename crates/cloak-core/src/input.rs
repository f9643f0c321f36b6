use serde::{Deserialize, Serialize};

/// Logical key codes delivered by the windowing collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Space,
    Escape,
    /// Any key the simulation has no binding for.
    Other(u32),
}

/// Modifier keys held while a key event fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };
}

/// A discrete key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed(Key, Modifiers),
    Released(Key, Modifiers),
}

/// Intent flags of a character, each held "pressed" for the tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub jump: bool,
}

impl Intent {
    /// Net horizontal intent: right minus left, one of -1, 0, 1.
    pub fn horizontal(&self) -> i32 {
        self.right as i32 - self.left as i32
    }

    pub fn any_horizontal(&self) -> bool {
        self.left || self.right
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_intent() {
        let mut intent = Intent::default();
        assert_eq!(intent.horizontal(), 0);
        intent.right = true;
        assert_eq!(intent.horizontal(), 1);
        intent.left = true;
        assert_eq!(intent.horizontal(), 0);
        assert!(intent.any_horizontal());
        intent.right = false;
        assert_eq!(intent.horizontal(), -1);
    }
}
