// Keyrelay Output Capabilities
// The key set a virtual device declares, derived from the active profile

use std::collections::BTreeSet;

use super::UInputError;
use crate::profile::RemapProfile;
use crate::Key;

/// Key codes the virtual device is allowed to emit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    keys: BTreeSet<Key>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the declaration for `profile` driven by a source advertising `source_keys`.
    ///
    /// The result holds every destination the profile can produce, the keys the
    /// profile requires, and the identity image of source keys the profile leaves
    /// alone, which are exactly the keys the event loop can ever forward.
    pub fn derive(profile: &RemapProfile, source_keys: &[Key]) -> Self {
        let mut keys = profile.outputs();
        keys.extend(profile.required().iter().copied());
        keys.extend(source_keys.iter().map(|key| profile.map_key(*key)));
        Self { keys }
    }

    pub fn declare(&mut self, key: Key) {
        self.keys.insert(key);
    }

    pub fn contains(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = Key> + '_ {
        self.keys.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys the loop could forward under `profile` that this set does not declare
    pub fn missing_for(&self, profile: &RemapProfile, source_keys: &[Key]) -> Vec<Key> {
        let needed = Self::derive(profile, source_keys);
        needed.keys.difference(&self.keys).copied().collect()
    }

    /// Reject a declaration that would let the loop emit an undeclared key
    pub fn verify(&self, profile: &RemapProfile, source_keys: &[Key]) -> Result<(), UInputError> {
        if self.is_empty() {
            return Err(UInputError::NoCapabilities);
        }
        let missing = self.missing_for(profile, source_keys);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(UInputError::UndeclaredKeys(missing))
        }
    }
}

impl FromIterator<Key> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileId;

    fn zero2() -> &'static RemapProfile {
        RemapProfile::builtin(ProfileId::EightBitdoZero2)
    }

    #[test]
    fn test_derive_without_source_keys_is_reference_set() {
        let caps = CapabilitySet::derive(zero2(), &[]);
        let expected: CapabilitySet = [Key::ESC, Key::W, Key::A, Key::S, Key::D, Key::ENTER]
            .into_iter()
            .collect();
        assert_eq!(caps, expected);
    }

    #[test]
    fn test_derive_includes_identity_image_of_source_keys() {
        // TAB has no entry, so it passes through and must be declared
        let caps = CapabilitySet::derive(zero2(), &[Key::E, Key::TAB]);
        assert!(caps.contains(Key::TAB));
        assert!(caps.contains(Key::W));
        // E itself is remapped away and never emitted
        assert!(!caps.contains(Key::E));
    }

    #[test]
    fn test_every_destination_is_declared() {
        let profile = zero2();
        let caps = CapabilitySet::derive(profile, &[]);
        for (_, to) in profile.entries() {
            assert!(caps.contains(to), "{} not declared", to);
        }
    }

    #[test]
    fn test_verify_rejects_incomplete_declaration() {
        let caps: CapabilitySet = [Key::ESC, Key::W, Key::A, Key::S, Key::D, Key::ENTER]
            .into_iter()
            .collect();
        let err = caps.verify(zero2(), &[Key::TAB]).unwrap_err();
        assert!(matches!(err, UInputError::UndeclaredKeys(ref keys) if keys == &vec![Key::TAB]));
    }

    #[test]
    fn test_verify_rejects_empty_declaration() {
        let caps = CapabilitySet::new();
        assert!(matches!(
            caps.verify(zero2(), &[]),
            Err(UInputError::NoCapabilities)
        ));
    }

    #[test]
    fn test_verify_accepts_derived_declaration() {
        let source = [Key::E, Key::C, Key::TAB, Key::SPACE];
        let caps = CapabilitySet::derive(zero2(), &source);
        assert!(caps.verify(zero2(), &source).is_ok());
    }

    #[test]
    fn test_derived_set_always_verifies() {
        use strum::IntoEnumIterator;

        let sources: [&[Key]; 4] = [
            &[],
            &[Key::E, Key::S, Key::D, Key::F],
            &[Key::TAB, Key::SPACE, Key::LEFT_SHIFT],
            &[Key::W, Key::A, Key::ESC, Key::ENTER, Key::C, Key::Q],
        ];
        for id in ProfileId::iter() {
            let profile = RemapProfile::builtin(id);
            for source in sources {
                let caps = CapabilitySet::derive(profile, source);
                assert!(caps.verify(profile, source).is_ok(), "{} with {:?}", id, source);
                assert!(caps.missing_for(profile, source).is_empty());
            }
        }
    }
}
