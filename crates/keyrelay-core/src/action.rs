// Keyrelay Key Actions
// The value field of an EV_KEY event

use std::fmt;

/// What an EV_KEY event does to its key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Action {
    Release = 0,
    Press = 1,
    /// Autorepeat while held; forwarded like any other event
    Repeat = 2,
}

impl Action {
    /// Key is down after this event
    pub fn is_pressed(self) -> bool {
        self != Action::Release
    }

    /// Decode an event value. Values outside 0..=2 are not key actions.
    pub fn from_value(value: i32) -> Option<Self> {
        [Action::Release, Action::Press, Action::Repeat]
            .into_iter()
            .find(|action| action.value() == value)
    }

    pub fn value(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Release => "release",
            Action::Press => "press",
            Action::Repeat => "repeat",
        })
    }
}
