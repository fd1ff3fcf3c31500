//! Prebuilt synthesis voices

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Voices offered by the synthesis service
///
/// The set is fixed by the service; there is no voice discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Voice {
    Puck,
    Kore,
    Fenrir,
    Charon,
    Zephyr,
}

/// Presentation details for the voice menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        })
    }
}

impl Voice {
    /// All voices in menu order
    pub const ALL: [Voice; 5] = [
        Voice::Puck,
        Voice::Kore,
        Voice::Fenrir,
        Voice::Charon,
        Voice::Zephyr,
    ];

    /// Name the service expects in `prebuiltVoiceConfig`
    pub fn name(self) -> &'static str {
        match self {
            Voice::Puck => "Puck",
            Voice::Kore => "Kore",
            Voice::Fenrir => "Fenrir",
            Voice::Charon => "Charon",
            Voice::Zephyr => "Zephyr",
        }
    }

    /// Short character description
    pub fn description(self) -> &'static str {
        match self {
            Voice::Puck => "Energetic & clear",
            Voice::Kore => "Calm & soothing",
            Voice::Fenrir => "Deep & authoritative",
            Voice::Charon => "Steady & professional",
            Voice::Zephyr => "Soft & gentle",
        }
    }

    pub fn gender(self) -> Gender {
        match self {
            Voice::Kore | Voice::Zephyr => Gender::Female,
            Voice::Puck | Voice::Fenrir | Voice::Charon => Gender::Male,
        }
    }

    /// Voice at a 1-based menu position
    pub fn from_menu_index(idx: usize) -> Option<Voice> {
        idx.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    /// 1-based menu position
    pub fn menu_index(self) -> usize {
        Self::ALL.iter().position(|&v| v == self).unwrap_or(0) + 1
    }
}

impl Default for Voice {
    fn default() -> Self {
        Voice::Zephyr
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Voice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown voice '{}'", wanted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("kore".parse::<Voice>(), Ok(Voice::Kore));
        assert_eq!(" FENRIR ".parse::<Voice>(), Ok(Voice::Fenrir));
        assert!("Alloy".parse::<Voice>().is_err());
    }

    #[test]
    fn test_menu_index_roundtrip() {
        for voice in Voice::ALL {
            assert_eq!(Voice::from_menu_index(voice.menu_index()), Some(voice));
        }
        assert_eq!(Voice::from_menu_index(0), None);
        assert_eq!(Voice::from_menu_index(6), None);
    }

    #[test]
    fn test_default_voice() {
        assert_eq!(Voice::default(), Voice::Zephyr);
        assert_eq!(Voice::Zephyr.gender(), Gender::Female);
        assert_eq!(Voice::Fenrir.gender().to_string(), "Male");
    }
}
