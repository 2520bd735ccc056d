// Copyright (c) 2024 Mike Tsao

use super::Note;
use crate::prelude::*;
use derivative::Derivative;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

impl PatternBuilder {
    /// The overridden Builder build() method.
    pub fn build(&self) -> Result<Pattern, PatternBuilderError> {
        match self.build_from_builder() {
            Ok(mut s) => {
                s.after_deser();
                Ok(s)
            }
            Err(e) => Err(e),
        }
    }

    /// Appends a note.
    pub fn note(&mut self, note: Note) -> &mut Self {
        self.notes.get_or_insert_with(Vec::default).push(note);
        self
    }
}

/// A [Pattern] is a fixed-length row of slots, each holding zero or more
/// [Note]s. It repeats for as long as the transport runs.
///
/// A note lands in the slot its `time` names. Notes whose `time` is past the
/// end of the pattern are kept but never sound.
#[derive(Clone, Debug, Derivative, Builder, Serialize, Deserialize)]
#[derivative(Default, PartialEq)]
#[builder(build_fn(private, name = "build_from_builder"))]
#[serde(rename_all = "kebab-case")]
pub struct Pattern {
    /// The notes, in the order they were given.
    #[builder(default)]
    notes: Vec<Note>,

    /// How many slots the pattern has.
    #[builder(default = "16")]
    #[derivative(Default(value = "16"))]
    length: usize,

    /// How far apart the slots are.
    #[builder(default = "NoteValue::Sixteenth")]
    #[derivative(Default(value = "NoteValue::Sixteenth"))]
    step: NoteValue,

    #[builder(setter(skip))]
    #[serde(skip)]
    #[derivative(PartialEq = "ignore")]
    e: PatternEphemerals,
}
#[derive(Clone, Debug, Default)]
pub struct PatternEphemerals {
    // The enabled notes of each slot.
    slots: Vec<Vec<Note>>,
}
impl Serializable for Pattern {
    fn after_deser(&mut self) {
        self.rebuild_slots();
    }
}
impl Pattern {
    /// Creates a [Pattern] of the given length holding the given notes.
    pub fn new_with(notes: Vec<Note>, length: usize) -> Self {
        let mut r = Self {
            notes,
            length,
            ..Default::default()
        };
        r.rebuild_slots();
        r
    }

    fn rebuild_slots(&mut self) {
        let mut slots = vec![Vec::default(); self.length];
        self.notes
            .iter()
            .filter(|n| n.enabled && n.time < self.length)
            .for_each(|n| slots[n.time].push(n.clone()));
        self.e.slots = slots;
    }

    #[allow(missing_docs)]
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Replaces every note.
    pub fn set_notes(&mut self, notes: Vec<Note>) {
        self.notes = notes;
        self.rebuild_slots();
    }

    /// The number of slots.
    pub fn length(&self) -> usize {
        self.length
    }

    /// The note value that separates one slot from the next.
    pub fn step(&self) -> NoteValue {
        self.step
    }

    /// The musical time between consecutive slots.
    pub fn slot_spacing(&self) -> MusicalTime {
        self.step.duration()
    }

    /// How long one pass through the pattern takes.
    pub fn duration(&self) -> MusicalTime {
        self.slot_spacing() * self.length
    }

    /// The enabled notes of the slot at `index`. Out-of-range slots are
    /// empty.
    pub fn slot(&self, index: usize) -> &[Note] {
        self.e
            .slots
            .get(index)
            .map(|s| s.as_slice())
            .unwrap_or_default()
    }

    /// Snapshot of every slot's enabled notes.
    pub(crate) fn slots(&self) -> &[Vec<Note>] {
        &self.e.slots
    }

    /// Whether the pattern would never trigger anything.
    pub fn is_silent(&self) -> bool {
        self.e.slots.iter().all(|s| s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c4() -> Pitch {
        Pitch::C4
    }

    #[test]
    fn pattern_defaults() {
        let p = PatternBuilder::default().build().unwrap();
        assert_eq!(p.length(), 16);
        assert_eq!(p.slot_spacing(), MusicalTime::DURATION_SIXTEENTH);
        assert_eq!(p.duration(), MusicalTime::DURATION_WHOLE);
        assert!(p.is_silent(), "a pattern without notes is valid and silent");
    }

    #[test]
    fn slots_hold_chords_and_skip_disabled_notes() {
        let p = PatternBuilder::default()
            .note(Note::new_with(c4(), 0, NoteValue::Eighth))
            .note(Note::new_with(Pitch::new(64), 0, NoteValue::Eighth))
            .note(Note::new_with(Pitch::new(67), 2, NoteValue::Eighth).disabled())
            .build()
            .unwrap();
        assert_eq!(p.slot(0).len(), 2);
        assert!(p.slot(1).is_empty());
        assert!(p.slot(2).is_empty(), "disabled notes never land in a slot");
        assert_eq!(p.notes().len(), 3, "disabled notes are kept");
    }

    #[test]
    fn out_of_range_notes_are_empty() {
        let p = Pattern::new_with(vec![Note::new_with(c4(), 4, NoteValue::Eighth)], 4);
        assert!(p.is_silent());
        assert!(p.slot(4).is_empty());
        assert!(p.slot(100).is_empty());
    }

    #[test]
    fn duplicates_are_kept() {
        let note = Note::new_with(c4(), 1, NoteValue::Eighth);
        let p = Pattern::new_with(vec![note.clone(), note], 16);
        assert_eq!(p.slot(1).len(), 2);
    }

    #[test]
    fn deserialization_rebuilds_slots() {
        let p = Pattern::new_with(vec![Note::new_with(c4(), 3, NoteValue::Quarter)], 8);
        let json = serde_json::to_string(&p).unwrap();
        let mut p2: Pattern = serde_json::from_str(&json).unwrap();
        assert!(p2.slot(3).is_empty(), "ephemerals aren't serialized");
        p2.after_deser();
        assert_eq!(p2.slot(3).len(), 1);
        assert_eq!(p, p2);
    }
}
