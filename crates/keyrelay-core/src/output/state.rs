// Keyrelay Held Key Tracking
// Which keys the virtual device currently reports as down

use std::collections::BTreeSet;

use crate::{Action, Key};

/// Keys pressed on the output side and not yet released.
///
/// Fed with the events after remapping, so it holds destination codes.
#[derive(Debug, Clone, Default)]
pub struct PressedKeyState {
    held: BTreeSet<Key>,
}

impl PressedKeyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one forwarded key event
    pub fn apply(&mut self, key: Key, action: Action) {
        if action.is_pressed() {
            self.held.insert(key);
        } else {
            self.held.remove(&key);
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// Held keys in code order
    pub fn held(&self) -> impl Iterator<Item = Key> + '_ {
        self.held.iter().copied()
    }

    /// Empty the set, returning what was held in code order
    pub fn take_all(&mut self) -> Vec<Key> {
        std::mem::take(&mut self.held).into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}
