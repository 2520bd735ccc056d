// Copyright (c) 2024 Mike Tsao

use super::{Note, Pattern};
use crate::{
    error::{Error, Result},
    orchestration::TrackUid,
    prelude::*,
    types::declare_uid,
};
use rustc_hash::FxHashMap;

declare_uid!(
    /// Identifies a [Pattern].
    PatternUid
);
declare_uid!(
    /// Identifies one installed schedule of a [Pattern]. Every edit of the
    /// pattern installs a new schedule under a new [SequenceUid].
    SequenceUid
);

/// One note that a schedule wants played.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledTrigger {
    /// The track that owns the pattern.
    pub track_uid: TrackUid,
    #[allow(missing_docs)]
    pub pattern_uid: PatternUid,
    /// The schedule that produced this trigger.
    pub sequence_uid: SequenceUid,
    #[allow(missing_docs)]
    pub note: Note,
    /// The slot's position on the transport.
    pub position: MusicalTime,
    /// The slot's transport time, from the clock.
    pub time: Seconds,
    /// The note's length at the current tempo.
    pub duration: Seconds,
}

/// The callback that [PatternScheduler::work()] invokes for each trigger.
pub type TriggerFn<'a> = dyn FnMut(ScheduledTrigger) + 'a;

/// The live, installed form of a [Pattern]: a frozen copy of its slots bound
/// to the transport, starting at the origin and repeating forever.
#[derive(Debug)]
struct ScheduledSequence {
    uid: SequenceUid,
    track_uid: TrackUid,
    slots: Vec<Vec<Note>>,
    spacing: MusicalTime,
}
impl ScheduledSequence {
    // Visits every step whose start falls in the half-open range.
    fn work(
        &self,
        pattern_uid: PatternUid,
        range: &TimeRange,
        clock: &ClockService,
        trigger_fn: &mut TriggerFn,
    ) {
        let spacing = self.spacing.total_units();
        if spacing == 0 || self.slots.is_empty() || range.is_empty() {
            return;
        }
        let mut step = range.start().total_units().div_ceil(spacing);
        loop {
            let position = MusicalTime::new_with_units(step * spacing);
            if !range.contains(&position) {
                break;
            }
            for note in &self.slots[step % self.slots.len()] {
                trigger_fn(ScheduledTrigger {
                    track_uid: self.track_uid,
                    pattern_uid,
                    sequence_uid: self.uid,
                    note: note.clone(),
                    position,
                    time: clock.seconds_at(position),
                    duration: note.duration.duration().as_seconds(clock.tempo()),
                });
            }
            step += 1;
        }
    }
}

/// [PatternScheduler] owns every [Pattern] in the session along with its
/// installed schedule, and turns them into triggers as the transport moves.
///
/// A pattern and its schedule always agree. Editing a pattern disposes the old
/// schedule and installs a new one in the same `&mut self` call, so nothing
/// that [PatternScheduler::work()] sees can belong to a superseded version.
#[derive(Debug, Default)]
pub struct PatternScheduler {
    pattern_uid_factory: UidFactory<PatternUid>,
    sequence_uid_factory: UidFactory<SequenceUid>,

    patterns: FxHashMap<PatternUid, Pattern>,
    sequences: FxHashMap<PatternUid, ScheduledSequence>,
    pattern_owners: FxHashMap<PatternUid, TrackUid>,

    // Installation order, so that triggers within a tick come out in a
    // stable order.
    ordered_pattern_uids: Vec<PatternUid>,

    pattern_length: usize,
}
impl PatternScheduler {
    /// Creates a scheduler whose new patterns have `pattern_length` slots.
    pub fn new_with(pattern_length: usize) -> Self {
        Self {
            pattern_length,
            ..Default::default()
        }
    }

    /// The number of slots new patterns get.
    pub fn pattern_length(&self) -> usize {
        if self.pattern_length == 0 {
            16
        } else {
            self.pattern_length
        }
    }

    /// Changes the number of slots that patterns created from now on get.
    pub fn set_pattern_length(&mut self, pattern_length: usize) {
        self.pattern_length = pattern_length;
    }

    /// Creates a pattern from the given notes for the given track and
    /// installs its schedule.
    pub fn create_pattern(&mut self, track_uid: TrackUid, notes: Vec<Note>) -> PatternUid {
        let pattern = Pattern::new_with(notes, self.pattern_length());
        self.add_pattern(track_uid, pattern, None)
    }

    /// Adds an already-built pattern. If `uid` is given and has never been
    /// handed out, it is used, and the factory is told about it; otherwise a
    /// fresh one is minted.
    pub fn add_pattern(
        &mut self,
        track_uid: TrackUid,
        pattern: Pattern,
        uid: Option<PatternUid>,
    ) -> PatternUid {
        let pattern_uid = match uid {
            Some(uid) if self.pattern_uid_factory.is_unminted(uid) => {
                self.pattern_uid_factory.notify_externally_minted_uid(uid);
                uid
            }
            _ => self.pattern_uid_factory.mint_next(),
        };
        self.install(pattern_uid, track_uid, &pattern);
        self.patterns.insert(pattern_uid, pattern);
        self.pattern_owners.insert(pattern_uid, track_uid);
        self.ordered_pattern_uids.push(pattern_uid);
        pattern_uid
    }

    /// Replaces a pattern's notes. The old schedule is disposed and the new
    /// one installed before this returns.
    pub fn update_pattern(
        &mut self,
        track_uid: TrackUid,
        pattern_uid: PatternUid,
        notes: Vec<Note>,
    ) -> Result<SequenceUid> {
        self.check_owner(track_uid, pattern_uid)?;
        let Some(pattern) = self.patterns.get_mut(&pattern_uid) else {
            return Err(Error::ResourceNotFound(format!("pattern {pattern_uid}")));
        };
        pattern.set_notes(notes);
        let pattern = pattern.clone();
        self.dispose_sequence(pattern_uid);
        Ok(self.install(pattern_uid, track_uid, &pattern))
    }

    /// Disposes a pattern's schedule and forgets the pattern.
    pub fn remove_pattern(
        &mut self,
        track_uid: TrackUid,
        pattern_uid: PatternUid,
    ) -> Result<Pattern> {
        self.check_owner(track_uid, pattern_uid)?;
        self.dispose_sequence(pattern_uid);
        self.pattern_owners.remove(&pattern_uid);
        self.ordered_pattern_uids.retain(|uid| *uid != pattern_uid);
        self.patterns
            .remove(&pattern_uid)
            .ok_or_else(|| Error::ResourceNotFound(format!("pattern {pattern_uid}")))
    }

    /// Runs the pattern's notes through a generator and commits the result
    /// as an edit.
    pub fn apply_generator(
        &mut self,
        track_uid: TrackUid,
        pattern_uid: PatternUid,
        generator: &mut dyn NoteGenerator,
    ) -> Result<SequenceUid> {
        self.check_owner(track_uid, pattern_uid)?;
        let Some(pattern) = self.patterns.get(&pattern_uid) else {
            return Err(Error::ResourceNotFound(format!("pattern {pattern_uid}")));
        };
        let notes = generator.generate(pattern.notes(), pattern.length());
        self.update_pattern(track_uid, pattern_uid, notes)
    }

    /// Issues a trigger for every enabled note whose slot starts within
    /// `range`. Wall-clock times come from `clock`.
    pub fn work(&self, range: &TimeRange, clock: &ClockService, trigger_fn: &mut TriggerFn) {
        for pattern_uid in &self.ordered_pattern_uids {
            if let Some(sequence) = self.sequences.get(pattern_uid) {
                sequence.work(*pattern_uid, range, clock, trigger_fn);
            }
        }
    }

    /// Forgets every pattern and disposes every schedule.
    pub fn dispose_all(&mut self) {
        self.sequences.clear();
        self.patterns.clear();
        self.pattern_owners.clear();
        self.ordered_pattern_uids.clear();
    }

    #[allow(missing_docs)]
    pub fn pattern(&self, pattern_uid: PatternUid) -> Option<&Pattern> {
        self.patterns.get(&pattern_uid)
    }

    /// The track that owns the pattern.
    pub fn owner(&self, pattern_uid: PatternUid) -> Option<TrackUid> {
        self.pattern_owners.get(&pattern_uid).copied()
    }

    /// The pattern's current schedule, if installed.
    pub fn sequence_uid(&self, pattern_uid: PatternUid) -> Option<SequenceUid> {
        self.sequences.get(&pattern_uid).map(|s| s.uid)
    }

    /// The number of installed schedules.
    pub fn live_sequence_count(&self) -> usize {
        self.sequences.len()
    }

    /// The number of installed schedules belonging to `track_uid`.
    pub fn live_sequence_count_for_track(&self, track_uid: TrackUid) -> usize {
        self.sequences
            .values()
            .filter(|s| s.track_uid == track_uid)
            .count()
    }

    fn check_owner(&self, track_uid: TrackUid, pattern_uid: PatternUid) -> Result<()> {
        match self.pattern_owners.get(&pattern_uid) {
            Some(owner) if *owner == track_uid => Ok(()),
            Some(_) => Err(Error::ResourceNotFound(format!(
                "pattern {pattern_uid} in track {track_uid}"
            ))),
            None => Err(Error::ResourceNotFound(format!("pattern {pattern_uid}"))),
        }
    }

    fn install(
        &mut self,
        pattern_uid: PatternUid,
        track_uid: TrackUid,
        pattern: &Pattern,
    ) -> SequenceUid {
        let uid = self.sequence_uid_factory.mint_next();
        log::debug!("installing sequence {uid} for pattern {pattern_uid}");
        self.sequences.insert(
            pattern_uid,
            ScheduledSequence {
                uid,
                track_uid,
                slots: pattern.slots().to_vec(),
                spacing: pattern.slot_spacing(),
            },
        );
        uid
    }

    fn dispose_sequence(&mut self, pattern_uid: PatternUid) {
        if let Some(sequence) = self.sequences.remove(&pattern_uid) {
            log::debug!(
                "disposed sequence {} of pattern {pattern_uid}",
                sequence.uid
            );
        }
    }
}
