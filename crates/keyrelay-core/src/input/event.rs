// Keyrelay Input Layer - Event Records
// The kernel input_event record and event type checks

use std::fmt;
use std::mem;

use crate::{Action, Key};

/// EV_SYN event type code
pub const EV_SYN: u16 = 0x00;
/// EV_KEY event type code
pub const EV_KEY: u16 = 0x01;
/// SYN_REPORT code within EV_SYN
pub const SYN_REPORT: u16 = 0x00;

/// Size in bytes of one `struct input_event` on this platform
pub const INPUT_EVENT_SIZE: usize = mem::size_of::<libc::input_event>();

/// Check if an event type is a key event.
pub fn is_key_event(event_type: u16) -> bool {
    event_type == EV_KEY
}

/// Timestamp carried by an input event (`struct timeval`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventTime {
    pub sec: i64,
    pub usec: i64,
}

impl EventTime {
    pub fn new(sec: i64, usec: i64) -> Self {
        Self { sec, usec }
    }
}

/// One input event as read from or written to an event device.
///
/// Field-for-field the kernel's `struct input_event`; converting to and
/// from the raw record is lossless so passthrough stays wire-identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputEvent {
    pub time: EventTime,
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    /// Create an event with a zero timestamp
    pub fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            time: EventTime::default(),
            event_type,
            code,
            value,
        }
    }

    /// Key event helper
    pub fn key(key: Key, action: Action) -> Self {
        Self::new(EV_KEY, key.code(), action.value())
    }

    /// SYN_REPORT frame terminator
    pub fn syn_report() -> Self {
        Self::new(EV_SYN, SYN_REPORT, 0)
    }

    pub fn with_time(mut self, time: EventTime) -> Self {
        self.time = time;
        self
    }

    pub fn is_key(&self) -> bool {
        is_key_event(self.event_type)
    }

    pub fn is_syn_report(&self) -> bool {
        self.event_type == EV_SYN && self.code == SYN_REPORT
    }

    /// The key code, for key events only
    pub fn key_code(&self) -> Option<Key> {
        self.is_key().then_some(Key(self.code))
    }

    /// Press/release/repeat, for key events with a recognised value
    pub fn action(&self) -> Option<Action> {
        if self.is_key() {
            Action::from_value(self.value)
        } else {
            None
        }
    }

    /// Same event with the code replaced; type, value and time untouched
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    pub fn from_raw(raw: &libc::input_event) -> Self {
        Self {
            time: EventTime::new(raw.time.tv_sec as i64, raw.time.tv_usec as i64),
            event_type: raw.type_,
            code: raw.code,
            value: raw.value,
        }
    }

    pub fn to_raw(&self) -> libc::input_event {
        libc::input_event {
            time: libc::timeval {
                tv_sec: self.time.sec as libc::time_t,
                tv_usec: self.time.usec as libc::suseconds_t,
            },
            type_: self.event_type,
            code: self.code,
            value: self.value,
        }
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.key_code(), self.action()) {
            (Some(key), Some(action)) => write!(f, "{} {}", key, action),
            (Some(key), None) => write!(f, "{} value={}", key, self.value),
            _ => write!(
                f,
                "type={:#04x} code={} value={}",
                self.event_type, self.code, self.value
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_key_event_with_ev_key() {
        assert!(is_key_event(EV_KEY));
    }

    #[test]
    fn test_is_key_event_with_other_event() {
        assert!(!is_key_event(0x02)); // EV_REL
        assert!(!is_key_event(0x00)); // EV_SYN
        assert!(!is_key_event(0x03)); // EV_ABS
        assert!(!is_key_event(0x04)); // EV_MSC
    }

    #[test]
    fn test_raw_conversion_preserves_every_field() {
        let event = InputEvent::new(0x04, 4, 0x70008).with_time(EventTime::new(1_700_000_000, 123_456));
        let back = InputEvent::from_raw(&event.to_raw());
        assert_eq!(back, event);
    }

    #[test]
    fn test_key_accessors() {
        let press = InputEvent::key(Key::E, Action::Press);
        assert_eq!(press.key_code(), Some(Key::E));
        assert_eq!(press.action(), Some(Action::Press));

        let rel = InputEvent::new(0x02, 0, -3);
        assert_eq!(rel.key_code(), None);
        assert_eq!(rel.action(), None);
    }

    #[test]
    fn test_with_code_keeps_value_and_time() {
        let time = EventTime::new(5, 6);
        let event = InputEvent::key(Key::E, Action::Repeat).with_time(time);
        let remapped = event.with_code(Key::W.code());
        assert_eq!(remapped.code, Key::W.code());
        assert_eq!(remapped.value, 2);
        assert_eq!(remapped.time, time);
        assert_eq!(remapped.event_type, EV_KEY);
    }

    #[test]
    fn test_syn_report() {
        assert!(InputEvent::syn_report().is_syn_report());
        assert!(!InputEvent::new(EV_SYN, 3, 0).is_syn_report()); // SYN_DROPPED
    }

    #[test]
    fn test_event_size_matches_kernel_record() {
        #[cfg(target_pointer_width = "64")]
        assert_eq!(INPUT_EVENT_SIZE, 24);
    }

    #[test]
    fn test_display() {
        assert_eq!(InputEvent::key(Key::W, Action::Press).to_string(), "W press");
        assert_eq!(InputEvent::syn_report().to_string(), "type=0x00 code=0 value=0");
    }
}
