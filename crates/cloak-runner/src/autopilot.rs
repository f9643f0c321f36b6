use cloak_core::input::{Key, KeyEvent, Modifiers};

/// Scripted key presses standing in for a player, keyed by simulation tick.
pub struct Autopilot {
    script: Vec<(u64, KeyEvent)>,
    next: usize,
}

impl Autopilot {
    /// Walk right, jump mid-run, stop, then walk back left.
    pub fn demo(tick_rate_hz: f32) -> Self {
        let at = |seconds: f32| (seconds * tick_rate_hz).round() as u64;
        let press = |key| KeyEvent::Pressed(key, Modifiers::NONE);
        let release = |key| KeyEvent::Released(key, Modifiers::NONE);
        Self {
            script: vec![
                (at(0.5), press(Key::Right)),
                (at(1.5), press(Key::Space)),
                (at(1.6), release(Key::Space)),
                (at(3.0), release(Key::Right)),
                (at(4.0), press(Key::Left)),
                (at(5.5), release(Key::Left)),
            ],
            next: 0,
        }
    }

    /// Events due at or before `tick`, each returned once.
    pub fn due(&mut self, tick: u64) -> &[(u64, KeyEvent)] {
        let start = self.next;
        while self.next < self.script.len() && self.script[self.next].0 <= tick {
            self.next += 1;
        }
        &self.script[start..self.next]
    }
}
