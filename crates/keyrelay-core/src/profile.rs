// Keyrelay Remap Profiles
// Fixed code-to-code tables, one active per build

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::OnceLock;

use strum_macros::{Display, EnumIter, EnumString};

use crate::key::KEY_MAX;
use crate::Key;

/// Errors raised while building or selecting a profile
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    #[error("Key code {code} in profile '{profile}' exceeds KEY_MAX")]
    CodeOutOfRange { profile: String, code: u16 },
}

/// Built-in profiles compiled into the binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum ProfileId {
    /// 8BitDo Zero 2 in keyboard mode, driving a WASD game
    #[strum(serialize = "8bitdo-zero2")]
    EightBitdoZero2,
    /// Splitfish controller, driving a WASD game
    #[strum(serialize = "splitfish")]
    Splitfish,
}

/// The profile this build was compiled with.
#[cfg(feature = "profile-splitfish")]
pub const ACTIVE_PROFILE: ProfileId = ProfileId::Splitfish;
/// The profile this build was compiled with.
#[cfg(not(feature = "profile-splitfish"))]
pub const ACTIVE_PROFILE: ProfileId = ProfileId::EightBitdoZero2;

/// Keys the WASD target game needs even when nothing maps onto them
const WASD_REQUIRED: &[Key] = &[Key::ESC, Key::W, Key::A, Key::S, Key::D, Key::ENTER];

const EIGHTBITDO_ZERO2: &[(Key, Key)] = &[
    (Key::E, Key::W),
    (Key::C, Key::D),
    (Key::F, Key::S),
    (Key::D, Key::A),
    (Key::K, Key::ENTER),
    (Key::M, Key::ESC),
];

const SPLITFISH: &[(Key, Key)] = &[
    (Key::Y, Key::W),
    (Key::E, Key::D),
    (Key::Q, Key::A),
    (Key::X, Key::S),
    (Key::TAB, Key::ENTER),
    (Key::LEFT_CTRL, Key::ENTER),
];

/// An immutable key substitution table.
///
/// `map` is total: codes without an entry map to themselves.
#[derive(Debug, Clone)]
pub struct RemapProfile {
    name: String,
    mappings: HashMap<Key, Key>,
    required: BTreeSet<Key>,
}

impl RemapProfile {
    /// Create a profile, rejecting codes the kernel cannot carry
    pub fn new(
        name: impl Into<String>,
        mappings: HashMap<Key, Key>,
    ) -> Result<Self, ProfileError> {
        let name = name.into();
        if let Some(bad) = mappings
            .iter()
            .flat_map(|(from, to)| [*from, *to])
            .find(|key| key.code() > KEY_MAX)
        {
            return Err(ProfileError::CodeOutOfRange {
                profile: name,
                code: bad.code(),
            });
        }

        Ok(Self {
            name,
            mappings,
            required: BTreeSet::new(),
        })
    }

    /// Create a profile from (source, destination) pairs
    pub fn from_pairs(name: impl Into<String>, pairs: &[(Key, Key)]) -> Result<Self, ProfileError> {
        Self::new(name, pairs.iter().copied().collect())
    }

    /// Add keys the output device must declare regardless of the table
    pub fn with_required(mut self, keys: impl IntoIterator<Item = Key>) -> Self {
        self.required.extend(keys);
        self
    }

    /// Look up a built-in profile
    pub fn builtin(id: ProfileId) -> &'static RemapProfile {
        static ZERO2: OnceLock<RemapProfile> = OnceLock::new();
        static SPLIT: OnceLock<RemapProfile> = OnceLock::new();

        let (cell, table) = match id {
            ProfileId::EightBitdoZero2 => (&ZERO2, EIGHTBITDO_ZERO2),
            ProfileId::Splitfish => (&SPLIT, SPLITFISH),
        };
        cell.get_or_init(|| RemapProfile {
            name: id.to_string(),
            mappings: table.iter().copied().collect(),
            required: WASD_REQUIRED.iter().copied().collect(),
        })
    }

    /// Look up a built-in profile by its name
    pub fn by_name(name: &str) -> Result<&'static RemapProfile, ProfileError> {
        ProfileId::from_str(name)
            .map(Self::builtin)
            .map_err(|_| ProfileError::UnknownProfile(name.to_string()))
    }

    /// The profile selected at build time
    pub fn active() -> &'static RemapProfile {
        Self::builtin(ACTIVE_PROFILE)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Translate a raw key code
    pub fn map(&self, code: u16) -> u16 {
        self.map_key(Key(code)).code()
    }

    /// Translate a key
    pub fn map_key(&self, key: Key) -> Key {
        self.mappings.get(&key).copied().unwrap_or(key)
    }

    /// Check if a key has an explicit entry
    pub fn contains(&self, key: Key) -> bool {
        self.mappings.contains_key(&key)
    }

    /// Explicit entries, ordered by source key
    pub fn entries(&self) -> Vec<(Key, Key)> {
        let mut entries: Vec<_> = self.mappings.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort();
        entries
    }

    /// Every destination an explicit entry can produce
    pub fn outputs(&self) -> BTreeSet<Key> {
        self.mappings.values().copied().collect()
    }

    /// Keys declared on the output device regardless of the table
    pub fn required(&self) -> &BTreeSet<Key> {
        &self.required
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_zero2_table() {
        let profile = RemapProfile::builtin(ProfileId::EightBitdoZero2);
        assert_eq!(profile.map_key(Key::E), Key::W);
        assert_eq!(profile.map_key(Key::C), Key::D);
        assert_eq!(profile.map_key(Key::F), Key::S);
        assert_eq!(profile.map_key(Key::D), Key::A);
        assert_eq!(profile.map_key(Key::K), Key::ENTER);
        assert_eq!(profile.map_key(Key::M), Key::ESC);
        assert_eq!(profile.len(), 6);
    }

    #[test]
    fn test_splitfish_table() {
        let profile = RemapProfile::builtin(ProfileId::Splitfish);
        assert_eq!(profile.map_key(Key::Y), Key::W);
        assert_eq!(profile.map_key(Key::E), Key::D);
        assert_eq!(profile.map_key(Key::Q), Key::A);
        assert_eq!(profile.map_key(Key::X), Key::S);
        assert_eq!(profile.map_key(Key::TAB), Key::ENTER);
        assert_eq!(profile.map_key(Key::LEFT_CTRL), Key::ENTER);
    }

    #[test]
    fn test_identity_for_unmapped_codes() {
        for id in ProfileId::iter() {
            let profile = RemapProfile::builtin(id);
            for code in 0..=KEY_MAX {
                if !profile.contains(Key(code)) {
                    assert_eq!(profile.map(code), code, "{} code {}", profile.name(), code);
                }
            }
        }
    }

    #[test]
    fn test_outputs_are_required_keys() {
        for id in ProfileId::iter() {
            let profile = RemapProfile::builtin(id);
            for (_, to) in profile.entries() {
                assert!(profile.outputs().contains(&to));
            }
            assert!(profile.outputs().is_subset(profile.required()));
        }
    }

    #[test]
    fn test_profiles_are_independent() {
        let zero2 = RemapProfile::builtin(ProfileId::EightBitdoZero2);
        let split = RemapProfile::builtin(ProfileId::Splitfish);
        // E means different things in each table
        assert_eq!(zero2.map_key(Key::E), Key::W);
        assert_eq!(split.map_key(Key::E), Key::D);
        assert_eq!(split.map_key(Key::K), Key::K);
    }

    #[test]
    fn test_by_name() {
        assert_eq!(RemapProfile::by_name("splitfish").unwrap().name(), "splitfish");
        assert_eq!(RemapProfile::by_name("8bitdo-zero2").unwrap().name(), "8bitdo-zero2");
        assert_eq!(
            RemapProfile::by_name("dvorak").unwrap_err(),
            ProfileError::UnknownProfile("dvorak".to_string())
        );
    }

    #[test]
    fn test_active_matches_build() {
        assert_eq!(RemapProfile::active().name(), ACTIVE_PROFILE.to_string());
    }

    #[test]
    fn test_custom_profile_rejects_out_of_range() {
        let err = RemapProfile::from_pairs("bad", &[(Key::A, Key(0x300))]).unwrap_err();
        assert_eq!(
            err,
            ProfileError::CodeOutOfRange {
                profile: "bad".to_string(),
                code: 0x300
            }
        );
    }

    #[test]
    fn test_custom_profile_entries_sorted() {
        // M is 50, Q is 16
        let profile = RemapProfile::from_pairs("t", &[(Key::M, Key::A), (Key::Q, Key::C)]).unwrap();
        assert_eq!(profile.entries(), vec![(Key::Q, Key::C), (Key::M, Key::A)]);
        assert!(profile.required().is_empty());
    }
}
