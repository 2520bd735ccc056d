// Copyright (c) 2024 Mike Tsao

use super::FrequencyHz;
use crate::error::Error;
use core::{fmt::Display, str::FromStr};
use serde::{Deserialize, Serialize};

/// A pitch as a MIDI key number. Uses the C4=60 mapping, so `A4` is 69 and
/// 440 Hz.
///
/// The serialized form is scientific pitch notation (`C4`, `F#3`, `Bb2`,
/// `C-1`), which is also what [Display] produces. Flats are accepted on input
/// but always written back as sharps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pitch(u8);
impl Pitch {
    /// The lowest MIDI key.
    pub const MIN: Pitch = Pitch(0);
    /// The highest MIDI key.
    pub const MAX: Pitch = Pitch(127);
    /// Middle C.
    pub const C4: Pitch = Pitch(60);
    /// Concert A.
    pub const A4: Pitch = Pitch(69);

    const NAMES: [&'static str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];

    /// Creates a [Pitch] from a MIDI key number, clamping to the MIDI range.
    pub const fn new(key: u8) -> Self {
        if key > 127 {
            Self(127)
        } else {
            Self(key)
        }
    }

    /// The MIDI key number.
    pub const fn key(&self) -> u8 {
        self.0
    }

    /// Equal-tempered frequency with A4 = 440 Hz.
    pub fn frequency(&self) -> FrequencyHz {
        FrequencyHz(440.0 * 2.0f64.powf((self.0 as f64 - 69.0) / 12.0))
    }
}
impl Default for Pitch {
    fn default() -> Self {
        Self::C4
    }
}
impl Display for Pitch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let octave = self.0 as i16 / 12 - 1;
        write!(f, "{}{}", Self::NAMES[self.0 as usize % 12], octave)
    }
}
impl FromStr for Pitch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad_pitch = || Error::InvalidPitch(s.to_string());
        let mut chars = s.trim().chars();
        let letter = chars.next().ok_or_else(bad_pitch)?;
        let mut semitone: i16 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(bad_pitch()),
        };
        let rest = chars.as_str();
        let octave_str = if let Some(rest) = rest.strip_prefix('#') {
            semitone += 1;
            rest
        } else if let Some(rest) = rest.strip_prefix('b') {
            semitone -= 1;
            rest
        } else {
            rest
        };
        let octave: i8 = octave_str.parse().map_err(|_| bad_pitch())?;
        let key = (i16::from(octave) + 1) * 12 + semitone;
        if (0..=127).contains(&key) {
            Ok(Self(key as u8))
        } else {
            Err(bad_pitch())
        }
    }
}
impl TryFrom<String> for Pitch {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
impl From<Pitch> for String {
    fn from(value: Pitch) -> Self {
        value.to_string()
    }
}
impl From<u8> for Pitch {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn pitch_names_round_trip_through_keys() {
        for (name, key) in [
            ("C4", 60),
            ("E4", 64),
            ("G4", 67),
            ("A4", 69),
            ("C-1", 0),
            ("G9", 127),
            ("F#3", 54),
        ] {
            let pitch: Pitch = name.parse().unwrap();
            assert_eq!(pitch.key(), key, "{name} should be MIDI key {key}");
            assert_eq!(pitch.to_string(), name);
        }
    }

    #[test]
    fn flats_are_accepted_and_written_as_sharps() {
        let pitch: Pitch = "Bb2".parse().unwrap();
        assert_eq!(pitch.to_string(), "A#2");
    }

    #[test]
    fn bad_pitches_are_rejected() {
        for name in ["", "H4", "C", "C#x", "A#9", "Cb-1"] {
            assert!(name.parse::<Pitch>().is_err(), "{name:?} should not parse");
        }
    }

    #[test]
    fn extreme_octaves_are_rejected() {
        for name in ["C32767", "C-32768", "C127", "C-128", "C99999999999", "G#-2"] {
            assert!(
                matches!(name.parse::<Pitch>(), Err(Error::InvalidPitch(_))),
                "{name:?} should not parse"
            );
        }
    }

    #[test]
    fn frequency() {
        assert!(approx_eq!(f64, Pitch::A4.frequency().0, 440.0));
        assert!(approx_eq!(
            f64,
            Pitch::C4.frequency().0,
            261.6255653005986,
            epsilon = 0.000001
        ));
    }
}
