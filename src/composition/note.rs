// Copyright (c) 2024 Mike Tsao

use crate::prelude::*;
use derivative::Derivative;
use serde::{Deserialize, Serialize};

/// A [Note] is one cell of a step pattern. It knows which pitch it plays,
/// which slot it sits in, and how long it lasts once triggered.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default)]
pub struct Note {
    /// The pitch, written as `C4`, `F#3` and so on.
    pub pitch: Pitch,
    /// The slot index within the pattern.
    pub time: usize,
    /// How long the note sounds, as a note value.
    pub duration: NoteValue,
    /// Trigger amplitude.
    #[derivative(Default(value = "0.7.into()"))]
    pub velocity: Normal,
    /// Disabled notes stay in the pattern but never sound.
    #[derivative(Default(value = "true"))]
    pub enabled: bool,
}
impl Note {
    /// Creates an enabled [Note] with default velocity.
    pub fn new_with(pitch: Pitch, time: usize, duration: NoteValue) -> Self {
        Self {
            pitch,
            time,
            duration,
            ..Default::default()
        }
    }

    /// Builder-style velocity setter.
    pub fn velocity(mut self, velocity: Normal) -> Self {
        self.velocity = velocity;
        self
    }

    /// Builder-style disabler.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn note_record_format() {
        let note: Note = serde_json::from_value(json!({
            "pitch": "E4",
            "time": 3,
            "duration": "8n",
            "velocity": 0.7,
            "enabled": true
        }))
        .unwrap();
        assert_eq!(
            note,
            Note::new_with("E4".parse().unwrap(), 3, NoteValue::Eighth)
        );
    }

    #[test]
    fn missing_fields_take_defaults() {
        let note: Note = serde_json::from_value(json!({"pitch": "G4", "time": 1})).unwrap();
        assert!(note.enabled);
        assert_eq!(note.velocity, Normal::new(0.7));
        assert_eq!(note.duration, NoteValue::Eighth);
    }
}
