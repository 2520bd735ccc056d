// Copyright (c) 2024 Mike Tsao

use super::{
    record::{EffectRecord, PatternRecord, TrackRecord},
    EffectRegistry, EffectUid, InstrumentRegistry, InstrumentUid, RoutingReport, SignalRouter,
    Track, TrackTitle, TrackUid, TrackUidFactory,
};
use crate::{
    composition::{Note, Pattern, PatternUid},
    cores::{EffectKind, InstrumentKind},
    graph::{NodeUid, TriggerEvent},
    prelude::*,
};
use rustc_hash::FxHashMap;

/// [TrackManager] is the aggregate root of a session's live graph. It owns the
/// tracks, the two registries, the router and the pattern scheduler, and it
/// is the only thing that mutates any of them, which keeps teardown order
/// enforceable in one place.
///
/// Operations that name a track, instrument, effect or pattern that doesn't
/// exist are benign no-ops: they log a warning and return [None] or `false`.
/// UI actions can race with teardown, so this is expected.
#[derive(Debug, Default)]
pub struct TrackManager {
    uid_factory: TrackUidFactory,
    tracks: FxHashMap<TrackUid, Track>,
    track_uids: Vec<TrackUid>,
    current_track: Option<TrackUid>,

    instruments: InstrumentRegistry,
    effects: EffectRegistry,
    router: SignalRouter,
    scheduler: PatternScheduler,
}
impl TrackManager {
    /// Creates a manager whose new patterns have `pattern_length` slots.
    pub fn new_with(pattern_length: usize) -> Self {
        Self {
            scheduler: PatternScheduler::new_with(pattern_length),
            ..Default::default()
        }
    }

    /// Changes the number of slots that new patterns get.
    pub fn set_pattern_length(&mut self, pattern_length: usize) {
        self.scheduler.set_pattern_length(pattern_length);
    }

    /// Creates a standalone instrument connected to `sink`.
    pub fn create_instrument(
        &mut self,
        graph: &mut dyn AudioGraph,
        sink: NodeUid,
        kind: InstrumentKind,
    ) -> Option<InstrumentUid> {
        match self.instruments.create(graph, sink, kind, None) {
            Ok(uid) => Some(uid),
            Err(e) => {
                log::error!("couldn't create {} instrument: {e}", kind.instrument_type());
                None
            }
        }
    }

    /// Disposes an instrument that no track uses. An instrument that a track
    /// still plays is left alone, since removing it would orphan the track.
    pub fn remove_instrument(&mut self, graph: &mut dyn AudioGraph, uid: InstrumentUid) -> bool {
        if let Some(track) = self.tracks.values().find(|t| t.instrument_uid == uid) {
            log::warn!(
                "instrument {uid} belongs to track {}; remove the track instead",
                track.uid
            );
            return false;
        }
        self.instruments.dispose(graph, uid)
    }

    /// Creates a track. If `instrument_uid` is [None], a default instrument
    /// is created for it. A given instrument must exist and must not already
    /// belong to another track. Tracks without a name are called `Track N`.
    /// The first track becomes the current track.
    pub fn create_track(
        &mut self,
        graph: &mut dyn AudioGraph,
        sink: NodeUid,
        name: Option<&str>,
        instrument_uid: Option<InstrumentUid>,
    ) -> Option<TrackUid> {
        let instrument_uid = match instrument_uid {
            Some(uid) => {
                if !self.instruments.contains(uid) {
                    log::warn!("can't create track: instrument {uid} not found");
                    return None;
                }
                if let Some(owner) = self.tracks.values().find(|t| t.instrument_uid == uid) {
                    log::warn!(
                        "can't create track: instrument {uid} already belongs to track {}",
                        owner.uid
                    );
                    return None;
                }
                uid
            }
            None => self.create_instrument(graph, sink, InstrumentKind::default())?,
        };
        let title = name.map_or_else(
            || format!("Track {}", self.track_uids.len() + 1),
            |n| n.to_string(),
        );
        let uid = self.uid_factory.mint_next();
        Some(self.insert_track(Track::new_with(uid, TrackTitle(title), instrument_uid)))
    }

    fn insert_track(&mut self, track: Track) -> TrackUid {
        let uid = track.uid;
        log::debug!("created track {uid} '{}'", track.title);
        self.tracks.insert(uid, track);
        self.track_uids.push(uid);
        if self.current_track.is_none() {
            self.current_track = Some(uid);
        }
        uid
    }

    /// Removes a track and everything it owns. Pattern schedules go first,
    /// then effects, then the instrument, then the track itself. If it was
    /// the current track, the first remaining track (if any) becomes
    /// current.
    pub fn remove_track(&mut self, graph: &mut dyn AudioGraph, uid: TrackUid) -> bool {
        let Some(track) = self.tracks.get(&uid).cloned() else {
            log::warn!("can't remove track {uid}: not found");
            return false;
        };
        for pattern_uid in &track.pattern_uids {
            if let Err(e) = self.scheduler.remove_pattern(uid, *pattern_uid) {
                log::warn!("while removing track {uid}: {e}");
            }
        }
        for effect_uid in &track.effect_uids {
            self.effects.dispose(graph, *effect_uid);
        }
        self.instruments.dispose(graph, track.instrument_uid);
        self.router.forget(uid);
        self.tracks.remove(&uid);
        self.track_uids.retain(|u| *u != uid);
        if self.current_track == Some(uid) {
            self.current_track = self.track_uids.first().copied();
        }
        log::debug!("removed track {uid}");
        true
    }

    /// Appends an effect to a track's chain and rewires the chain.
    pub fn add_effect(
        &mut self,
        graph: &mut dyn AudioGraph,
        sink: NodeUid,
        track_uid: TrackUid,
        kind: EffectKind,
    ) -> Option<EffectUid> {
        self.add_effect_with_uid(graph, sink, track_uid, kind, None)
    }

    fn add_effect_with_uid(
        &mut self,
        graph: &mut dyn AudioGraph,
        sink: NodeUid,
        track_uid: TrackUid,
        kind: EffectKind,
        uid: Option<EffectUid>,
    ) -> Option<EffectUid> {
        let Some(track) = self.tracks.get(&track_uid) else {
            log::warn!("can't add effect: track {track_uid} not found");
            return None;
        };
        if !self.instruments.contains(track.instrument_uid) {
            log::warn!(
                "can't add effect: instrument {} of track {track_uid} not found",
                track.instrument_uid
            );
            return None;
        }
        let effect_uid = match self.effects.create(graph, kind, track_uid, uid) {
            Ok(uid) => uid,
            Err(e) => {
                log::error!("couldn't create {} effect: {e}", kind.effect_type());
                return None;
            }
        };
        if let Some(track) = self.tracks.get_mut(&track_uid) {
            track.effect_uids.push(effect_uid);
        }
        self.reconnect(graph, sink, track_uid);
        Some(effect_uid)
    }

    /// Takes an effect out of a track's chain, disposes it, and rewires the
    /// chain around the gap.
    pub fn remove_effect(
        &mut self,
        graph: &mut dyn AudioGraph,
        sink: NodeUid,
        track_uid: TrackUid,
        effect_uid: EffectUid,
    ) -> bool {
        let Some(track) = self.tracks.get_mut(&track_uid) else {
            log::warn!("can't remove effect: track {track_uid} not found");
            return false;
        };
        if !track.effect_uids.contains(&effect_uid) {
            log::warn!("can't remove effect: track {track_uid} has no effect {effect_uid}");
            return false;
        }
        track.effect_uids.retain(|u| *u != effect_uid);
        self.effects.dispose(graph, effect_uid);
        self.reconnect(graph, sink, track_uid);
        true
    }

    /// Moves an effect to a new position in its track's chain and rewires
    /// the chain.
    pub fn move_effect(
        &mut self,
        graph: &mut dyn AudioGraph,
        sink: NodeUid,
        track_uid: TrackUid,
        effect_uid: EffectUid,
        new_position: usize,
    ) -> bool {
        let Some(track) = self.tracks.get_mut(&track_uid) else {
            log::warn!("can't move effect: track {track_uid} not found");
            return false;
        };
        let Some(old_position) = track.effect_uids.iter().position(|u| *u == effect_uid) else {
            log::warn!("can't move effect: track {track_uid} has no effect {effect_uid}");
            return false;
        };
        if new_position >= track.effect_uids.len() {
            log::warn!("can't move effect {effect_uid} to out-of-bounds position {new_position}");
            return false;
        }
        let uid = track.effect_uids.remove(old_position);
        track.effect_uids.insert(new_position, uid);
        self.reconnect(graph, sink, track_uid);
        true
    }

    /// Rewires a track's chain. Returns [None] if the track doesn't exist.
    pub fn reconnect(
        &mut self,
        graph: &mut dyn AudioGraph,
        sink: NodeUid,
        track_uid: TrackUid,
    ) -> Option<RoutingReport> {
        let track = self.tracks.get(&track_uid)?;
        Some(
            self.router
                .reconnect(graph, sink, track, &self.instruments, &self.effects),
        )
    }

    /// Re-runs routing for every track that was waiting on a node still under
    /// construction, if that node is now ready. Returns how many tracks were
    /// rewired.
    pub fn refresh_pending_routes(&mut self, graph: &mut dyn AudioGraph, sink: NodeUid) -> usize {
        let mut count = 0;
        for track_uid in self.router.pending_tracks() {
            let Some(track) = self.tracks.get(&track_uid) else {
                self.router.forget(track_uid);
                continue;
            };
            let now_ready = self
                .router
                .deferred_effects(track_uid)
                .iter()
                .filter(|uid| track.effect_uids.contains(*uid))
                .any(|uid| {
                    self.effects
                        .get(*uid)
                        .is_some_and(|e| graph.is_node_ready(e.node()))
                });
            if now_ready {
                self.reconnect(graph, sink, track_uid);
                count += 1;
            }
        }
        count
    }

    /// Adds a pattern to a track and installs its schedule.
    pub fn create_pattern(&mut self, track_uid: TrackUid, notes: Vec<Note>) -> Option<PatternUid> {
        let Some(track) = self.tracks.get_mut(&track_uid) else {
            log::warn!("can't create pattern: track {track_uid} not found");
            return None;
        };
        let pattern_uid = self.scheduler.create_pattern(track_uid, notes);
        track.pattern_uids.push(pattern_uid);
        Some(pattern_uid)
    }

    /// Replaces a pattern's notes and its schedule.
    pub fn update_pattern(
        &mut self,
        track_uid: TrackUid,
        pattern_uid: PatternUid,
        notes: Vec<Note>,
    ) -> bool {
        match self.scheduler.update_pattern(track_uid, pattern_uid, notes) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("can't update pattern: {e}");
                false
            }
        }
    }

    /// Disposes a pattern's schedule and removes it from its track.
    pub fn remove_pattern(&mut self, track_uid: TrackUid, pattern_uid: PatternUid) -> bool {
        match self.scheduler.remove_pattern(track_uid, pattern_uid) {
            Ok(_) => {
                if let Some(track) = self.tracks.get_mut(&track_uid) {
                    track.pattern_uids.retain(|u| *u != pattern_uid);
                }
                true
            }
            Err(e) => {
                log::warn!("can't remove pattern: {e}");
                false
            }
        }
    }

    /// Runs a pattern through a note generator and commits the result.
    pub fn apply_generator(
        &mut self,
        track_uid: TrackUid,
        pattern_uid: PatternUid,
        generator: &mut dyn NoteGenerator,
    ) -> bool {
        match self
            .scheduler
            .apply_generator(track_uid, pattern_uid, generator)
        {
            Ok(_) => true,
            Err(e) => {
                log::warn!("can't generate pattern: {e}");
                false
            }
        }
    }

    /// Mutes or unmutes a track.
    pub fn set_track_muted(&mut self, track_uid: TrackUid, is_muted: bool) -> bool {
        self.with_track(track_uid, |t| t.is_muted = is_muted)
    }

    /// Solos or unsolos a track.
    pub fn set_track_solo(&mut self, track_uid: TrackUid, is_solo: bool) -> bool {
        self.with_track(track_uid, |t| t.is_solo = is_solo)
    }

    #[allow(missing_docs)]
    pub fn rename_track(&mut self, track_uid: TrackUid, title: &str) -> bool {
        self.with_track(track_uid, |t| t.title = TrackTitle(title.to_string()))
    }

    /// Sets the track's trim and applies it to its instrument node.
    pub fn set_track_volume(
        &mut self,
        graph: &mut dyn AudioGraph,
        track_uid: TrackUid,
        volume: Decibels,
    ) -> bool {
        if !self.with_track(track_uid, |t| t.volume = volume) {
            return false;
        }
        self.apply_track_volume(graph, track_uid);
        true
    }

    fn apply_track_volume(&self, graph: &mut dyn AudioGraph, track_uid: TrackUid) {
        let Some(track) = self.tracks.get(&track_uid) else {
            return;
        };
        if let Some(instrument) = self.instruments.get(track.instrument_uid) {
            if let Err(e) = graph.set_volume(instrument.node(), track.volume) {
                log::warn!("couldn't set volume of track {track_uid}: {e}");
            }
        }
    }

    fn with_track(&mut self, track_uid: TrackUid, f: impl FnOnce(&mut Track)) -> bool {
        if let Some(track) = self.tracks.get_mut(&track_uid) {
            f(track);
            true
        } else {
            log::warn!("track {track_uid} not found");
            false
        }
    }

    /// Whether the track's notes should sound: it isn't muted, and either no
    /// track is soloed or this one is.
    pub fn is_audible(&self, track_uid: TrackUid) -> bool {
        let any_solo = self.tracks.values().any(|t| t.is_solo);
        self.tracks
            .get(&track_uid)
            .is_some_and(|t| Self::audible(t, any_solo))
    }

    fn audible(track: &Track, any_solo: bool) -> bool {
        !track.is_muted && (!any_solo || track.is_solo)
    }

    /// Selects the track the UI is focused on.
    pub fn set_current_track(&mut self, track_uid: TrackUid) -> bool {
        if self.tracks.contains_key(&track_uid) {
            self.current_track = Some(track_uid);
            true
        } else {
            log::warn!("can't select track {track_uid}: not found");
            false
        }
    }

    #[allow(missing_docs)]
    pub fn current_track(&self) -> Option<TrackUid> {
        self.current_track
    }

    #[allow(missing_docs)]
    pub fn track(&self, track_uid: TrackUid) -> Option<&Track> {
        self.tracks.get(&track_uid)
    }

    /// Every track, in creation order.
    pub fn track_uids(&self) -> &[TrackUid] {
        &self.track_uids
    }

    #[allow(missing_docs)]
    pub fn instruments(&self) -> &InstrumentRegistry {
        &self.instruments
    }

    #[allow(missing_docs)]
    pub fn effects(&self) -> &EffectRegistry {
        &self.effects
    }

    #[allow(missing_docs)]
    pub fn scheduler(&self) -> &PatternScheduler {
        &self.scheduler
    }

    #[allow(missing_docs)]
    pub fn router(&self) -> &SignalRouter {
        &self.router
    }

    /// Sends the graph a trigger for every note scheduled within `range`,
    /// skipping tracks that aren't audible. Returns how many triggers were
    /// sent.
    pub fn work(
        &self,
        graph: &mut dyn AudioGraph,
        range: &TimeRange,
        clock: &ClockService,
    ) -> usize {
        let any_solo = self.tracks.values().any(|t| t.is_solo);
        let mut count = 0;
        self.scheduler.work(range, clock, &mut |trigger| {
            let Some(track) = self.tracks.get(&trigger.track_uid) else {
                return;
            };
            if !Self::audible(track, any_solo) {
                return;
            }
            let Some(instrument) = self.instruments.get(track.instrument_uid) else {
                return;
            };
            let event = TriggerEvent {
                node: instrument.node(),
                pitch: trigger.note.pitch,
                position: trigger.position,
                time: trigger.time,
                duration: trigger.duration,
                velocity: trigger.note.velocity,
            };
            match graph.trigger_attack_release(&event) {
                Ok(_) => count += 1,
                Err(e) => log::warn!("trigger on track {} failed: {e}", track.uid),
            }
        });
        count
    }

    /// Disposes everything: pattern schedules, then effects, then
    /// instruments, then the tracks themselves.
    pub fn teardown(&mut self, graph: &mut dyn AudioGraph) {
        // Uid factories are kept; ids never repeat within a session.
        self.scheduler.dispose_all();
        self.effects.dispose_all(graph);
        self.instruments.dispose_all(graph);
        self.tracks.clear();
        self.track_uids.clear();
        self.router.clear();
        self.current_track = None;
    }

    /// The persisted form of every track, in order.
    pub fn to_records(&self) -> Vec<TrackRecord> {
        self.track_uids
            .iter()
            .filter_map(|uid| self.tracks.get(uid))
            .map(|track| {
                let instrument = self.instruments.get(track.instrument_uid);
                TrackRecord {
                    id: track.uid.to_string(),
                    name: track.title.0.clone(),
                    instrument_type: instrument
                        .map(|i| i.instrument_type().to_string())
                        .unwrap_or_else(|| InstrumentKind::default().instrument_type().to_string()),
                    instrument_options: instrument.map(|i| i.kind().options()),
                    muted: track.is_muted,
                    solo: track.is_solo,
                    volume: track.volume.0,
                    patterns: track
                        .pattern_uids
                        .iter()
                        .filter_map(|uid| {
                            self.scheduler.pattern(*uid).map(|p| PatternRecord {
                                id: uid.to_string(),
                                notes: p.notes().to_vec(),
                                length: (p.length() != self.scheduler.pattern_length())
                                    .then_some(p.length()),
                            })
                        })
                        .collect(),
                    effects: track
                        .effect_uids
                        .iter()
                        .filter_map(|uid| self.effects.get(*uid))
                        .map(|e| EffectRecord {
                            effect_type: e.effect_type().to_string(),
                            options: e.kind().options(),
                        })
                        .collect(),
                }
            })
            .collect()
    }

    /// Builds a track and everything it owns from its persisted form. The
    /// record's numeric ids are reused unless this manager has already handed
    /// them out, so ids never repeat across reloads.
    pub fn restore_track(
        &mut self,
        graph: &mut dyn AudioGraph,
        sink: NodeUid,
        record: &TrackRecord,
    ) -> Option<TrackUid> {
        let kind = InstrumentKind::new_with_name(
            &record.instrument_type,
            record.instrument_options.as_ref(),
        );
        let instrument_uid = self.create_instrument(graph, sink, kind)?;

        let track_uid = match record.id.parse::<usize>().ok().map(TrackUid) {
            Some(uid) if self.uid_factory.is_unminted(uid) => {
                self.uid_factory.notify_externally_minted_uid(uid);
                uid
            }
            _ => self.uid_factory.mint_next(),
        };
        let title = if record.name.is_empty() {
            format!("Track {}", self.track_uids.len() + 1)
        } else {
            record.name.clone()
        };
        let mut track = Track::new_with(track_uid, TrackTitle(title), instrument_uid);
        track.is_muted = record.muted;
        track.is_solo = record.solo;
        track.volume = Decibels(record.volume);
        self.insert_track(track);
        self.apply_track_volume(graph, track_uid);

        for pattern in &record.patterns {
            let length = pattern.length.unwrap_or(self.scheduler.pattern_length());
            let pattern_uid = self.scheduler.add_pattern(
                track_uid,
                Pattern::new_with(pattern.notes.clone(), length),
                pattern.id.parse::<usize>().ok().map(PatternUid),
            );
            if let Some(track) = self.tracks.get_mut(&track_uid) {
                track.pattern_uids.push(pattern_uid);
            }
        }
        for effect in &record.effects {
            let kind = EffectKind::new_with_name(&effect.effect_type, Some(&effect.options));
            match self.effects.create(graph, kind, track_uid, None) {
                Ok(effect_uid) => {
                    if let Some(track) = self.tracks.get_mut(&track_uid) {
                        track.effect_uids.push(effect_uid);
                    }
                }
                Err(e) => log::error!("couldn't restore {} effect: {e}", kind.effect_type()),
            }
        }
        self.reconnect(graph, sink, track_uid);
        Some(track_uid)
    }
}
