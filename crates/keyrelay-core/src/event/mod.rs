// Keyrelay Event Handling
// The capture -> remap -> inject loop

pub mod r#loop;

pub use r#loop::{EventLoop, EventLoopError, EventLoopResult, LoopState, LoopStats, Tick};
