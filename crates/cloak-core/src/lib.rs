pub mod input;
pub mod render;
pub mod tiles;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::input::{Key, KeyEvent, Modifiers};
    use crate::render::{DrawCommand, DrawList};
    use crate::tiles::TileMap;

    /// Start marker two rows above a long floor.
    pub const FLAT_LEVEL: &str = "\
@

==============================";

    /// Player start, one guard, a half-height platform, both steps and a ceiling.
    pub const MIXED_LEVEL: &str = "\
^^^^^^^^^^^^
@     %
    __
  /    \\
============";

    /// Parse a level fixture that is known to be tab-free.
    pub fn level(text: &str) -> TileMap {
        TileMap::parse_str(text).expect("test level must parse")
    }

    pub fn press(key: Key) -> KeyEvent {
        KeyEvent::Pressed(key, Modifiers::NONE)
    }

    pub fn release(key: Key) -> KeyEvent {
        KeyEvent::Released(key, Modifiers::NONE)
    }

    /// Count recorded commands matching a predicate.
    pub fn count_commands(list: &DrawList, pred: impl Fn(&DrawCommand) -> bool) -> usize {
        list.commands.iter().filter(|c| pred(c)).count()
    }
}
