// Copyright (c) 2024 Mike Tsao

use super::{CompositionRecord, EffectUid, InstrumentUid, TrackManager, TrackUid};
use crate::{
    composition::{Note, PatternUid},
    cores::{EffectKind, InstrumentKind},
    error::{Error, Result},
    graph::{NodeSpec, NodeUid},
    prelude::*,
    util::SessionSettings,
};
use strum_macros::Display;

/// The externally visible lifecycle of a [CompositionSession].
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq)]
pub enum SessionState {
    /// The audio graph hasn't been bootstrapped.
    #[default]
    Uninitialized,
    /// The graph is up and the transport is at rest.
    Ready,
    /// The transport is running and notes are being scheduled.
    Playing,
    /// The transport is holding its position.
    Paused,
}

/// Identity and timestamps of the composition being edited.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositionMetadata {
    /// [None] until the composition is first saved.
    pub id: Option<String>,
    #[allow(missing_docs)]
    pub title: String,
    #[allow(missing_docs)]
    pub created_at: Option<String>,
    #[allow(missing_docs)]
    pub updated_at: Option<String>,
}
impl Default for CompositionMetadata {
    fn default() -> Self {
        Self {
            id: None,
            title: CompositionRecord::UNTITLED.to_string(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// [CompositionSession] is the front door. It owns the audio graph, the
/// transport, and the [TrackManager], and it gates every operation on the
/// graph having been bootstrapped.
///
/// Structural operations (creating tracks, instruments, effects) bootstrap
/// the graph lazily if needed. If that fails, they log it and return [None]
/// or `false`, as they do for ids that no longer exist. Only
/// [CompositionSession::initialize()], [CompositionSession::toggle_play()]
/// and the composition load/save operations return errors.
///
/// Time is driven from outside: the host calls
/// [CompositionSession::advance()] with however much musical time has passed,
/// and the session issues the triggers that fall within it.
#[derive(Debug)]
pub struct CompositionSession<G: AudioGraph> {
    graph: G,
    settings: SessionSettings,
    clock: ClockService,
    tracks: TrackManager,
    state: SessionState,

    master_node: Option<NodeUid>,
    volume: Decibels,

    metadata: CompositionMetadata,
    has_unsaved_changes: bool,
    last_autosave: Option<Seconds>,
}
impl<G: AudioGraph + Default> Default for CompositionSession<G> {
    fn default() -> Self {
        Self::new_with(G::default(), SessionSettings::default())
    }
}
impl<G: AudioGraph> CompositionSession<G> {
    /// Creates an uninitialized session on the given backend.
    pub fn new_with(graph: G, settings: SessionSettings) -> Self {
        let mut clock = ClockService::default();
        clock.set_tempo(settings.default_bpm.clamped());
        Self {
            graph,
            clock,
            tracks: TrackManager::new_with(settings.pattern_length),
            state: SessionState::default(),
            master_node: None,
            volume: settings.default_volume,
            metadata: CompositionMetadata::default(),
            has_unsaved_changes: false,
            last_autosave: None,
            settings,
        }
    }

    /// Bootstraps the audio graph and builds the master volume stage. Calling
    /// it again once it has succeeded does nothing.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state != SessionState::Uninitialized {
            return Ok(());
        }
        if !self.graph.is_started() {
            self.graph.start()?;
        }
        let master = self
            .graph
            .create_node(&NodeSpec::MasterVolume(self.volume))?;
        let destination = self.graph.destination();
        if let Err(e) = self.graph.connect(master, destination) {
            log::error!("{}", Error::RoutingFailure(format!("master volume: {e}")));
        }
        if let Err(e) = self.graph.set_volume(master, self.volume) {
            log::warn!("couldn't set master volume: {e}");
        }
        self.master_node = Some(master);
        self.state = SessionState::Ready;
        log::info!("session initialized");
        Ok(())
    }

    // Lazy initialization for operations that report failure as None.
    fn ensure_initialized(&mut self) -> bool {
        match self.initialize() {
            Ok(_) => true,
            Err(e) => {
                log::error!("couldn't initialize audio: {e}");
                false
            }
        }
    }

    /// Where every chain ends: the master volume stage once it exists.
    pub fn sink(&self) -> NodeUid {
        self.master_node.unwrap_or_else(|| self.graph.destination())
    }

    /// Starts, pauses, or resumes playback. From [SessionState::Uninitialized]
    /// this initializes first, and fails if that fails. Starting playback of
    /// an empty composition creates a default track first. Returns the new
    /// state.
    pub fn toggle_play(&mut self) -> Result<SessionState> {
        self.initialize()?;
        match self.state {
            SessionState::Playing => {
                self.clock.pause();
                self.state = SessionState::Paused;
                log::info!("playback paused at {}", self.clock.position());
            }
            SessionState::Ready | SessionState::Paused | SessionState::Uninitialized => {
                if self.tracks.track_uids().is_empty() {
                    log::info!("creating a default track for playback");
                    if self.create_track(None).is_none() {
                        log::warn!("playing without any tracks");
                    }
                }
                self.clock.start();
                self.state = SessionState::Playing;
                log::info!("playback started at {}", self.clock.position());
            }
        }
        Ok(self.state)
    }

    /// Stops playback and rewinds to the origin. Does nothing before
    /// initialization.
    pub fn stop(&mut self) {
        if self.state == SessionState::Uninitialized {
            return;
        }
        self.clock.stop();
        self.state = SessionState::Ready;
        log::info!("playback stopped");
    }

    /// Moves the transport forward and issues every trigger that falls
    /// within the elapsed span. Routing that was waiting on node construction
    /// is completed first. Returns how many triggers were issued; nothing
    /// happens unless playing.
    pub fn advance(&mut self, duration: MusicalTime) -> usize {
        if self.state != SessionState::Playing {
            return 0;
        }
        let sink = self.sink();
        self.tracks.refresh_pending_routes(&mut self.graph, sink);
        let range = self.clock.advance(duration);
        self.tracks.work(&mut self.graph, &range, &self.clock)
    }

    /// Like [CompositionSession::advance()], but in seconds at the current
    /// tempo.
    pub fn advance_seconds(&mut self, seconds: Seconds) -> usize {
        let duration = MusicalTime::from_seconds(seconds, self.clock.tempo());
        self.advance(duration)
    }

    /// Sets the tempo, clamped to the range the UI offers. Takes effect on
    /// the next [CompositionSession::advance()].
    pub fn set_bpm(&mut self, bpm: Tempo) {
        self.clock.set_tempo(bpm.clamped());
        self.mark_dirty();
    }

    #[allow(missing_docs)]
    pub fn bpm(&self) -> Tempo {
        self.clock.tempo()
    }

    /// Sets the master volume.
    pub fn set_volume(&mut self, volume: Decibels) {
        self.apply_volume(volume);
        self.mark_dirty();
    }

    fn apply_volume(&mut self, volume: Decibels) {
        self.volume = volume;
        if let Some(master) = self.master_node {
            if let Err(e) = self.graph.set_volume(master, volume) {
                log::warn!("couldn't set master volume: {e}");
            }
        }
    }

    #[allow(missing_docs)]
    pub fn volume(&self) -> Decibels {
        self.volume
    }

    /// Creates a track with a new default instrument.
    pub fn create_track(&mut self, name: Option<&str>) -> Option<TrackUid> {
        if !self.ensure_initialized() {
            return None;
        }
        let sink = self.sink();
        let r = self.tracks.create_track(&mut self.graph, sink, name, None);
        self.mark_dirty_if(r.is_some());
        r
    }

    /// Creates a track that plays an existing, unowned instrument.
    pub fn create_track_with_instrument(
        &mut self,
        name: Option<&str>,
        instrument_uid: InstrumentUid,
    ) -> Option<TrackUid> {
        if !self.ensure_initialized() {
            return None;
        }
        let sink = self.sink();
        let r = self
            .tracks
            .create_track(&mut self.graph, sink, name, Some(instrument_uid));
        self.mark_dirty_if(r.is_some());
        r
    }

    /// Removes a track and everything it owns.
    pub fn remove_track(&mut self, track_uid: TrackUid) -> bool {
        let r = self.tracks.remove_track(&mut self.graph, track_uid);
        self.mark_dirty_if(r)
    }

    /// Creates an instrument that no track owns yet.
    pub fn create_instrument(&mut self, kind: InstrumentKind) -> Option<InstrumentUid> {
        if !self.ensure_initialized() {
            return None;
        }
        let sink = self.sink();
        let r = self.tracks.create_instrument(&mut self.graph, sink, kind);
        self.mark_dirty_if(r.is_some());
        r
    }

    /// Removes an instrument that no track owns.
    pub fn remove_instrument(&mut self, instrument_uid: InstrumentUid) -> bool {
        let r = self.tracks.remove_instrument(&mut self.graph, instrument_uid);
        self.mark_dirty_if(r)
    }

    /// Appends an effect to a track's chain.
    pub fn add_effect(&mut self, track_uid: TrackUid, kind: EffectKind) -> Option<EffectUid> {
        if !self.ensure_initialized() {
            return None;
        }
        let sink = self.sink();
        let r = self
            .tracks
            .add_effect(&mut self.graph, sink, track_uid, kind);
        self.mark_dirty_if(r.is_some());
        r
    }

    /// Takes an effect out of a track's chain.
    pub fn remove_effect(&mut self, track_uid: TrackUid, effect_uid: EffectUid) -> bool {
        let sink = self.sink();
        let r = self
            .tracks
            .remove_effect(&mut self.graph, sink, track_uid, effect_uid);
        self.mark_dirty_if(r)
    }

    /// Moves an effect within its track's chain.
    pub fn move_effect(
        &mut self,
        track_uid: TrackUid,
        effect_uid: EffectUid,
        new_position: usize,
    ) -> bool {
        let sink = self.sink();
        let r = self
            .tracks
            .move_effect(&mut self.graph, sink, track_uid, effect_uid, new_position);
        self.mark_dirty_if(r)
    }

    #[allow(missing_docs)]
    pub fn create_pattern(&mut self, track_uid: TrackUid, notes: Vec<Note>) -> Option<PatternUid> {
        let r = self.tracks.create_pattern(track_uid, notes);
        self.mark_dirty_if(r.is_some());
        r
    }

    /// Replaces a pattern's notes. The next [CompositionSession::advance()]
    /// plays only the new ones.
    pub fn update_pattern(
        &mut self,
        track_uid: TrackUid,
        pattern_uid: PatternUid,
        notes: Vec<Note>,
    ) -> bool {
        let r = self.tracks.update_pattern(track_uid, pattern_uid, notes);
        self.mark_dirty_if(r)
    }

    #[allow(missing_docs)]
    pub fn remove_pattern(&mut self, track_uid: TrackUid, pattern_uid: PatternUid) -> bool {
        let r = self.tracks.remove_pattern(track_uid, pattern_uid);
        self.mark_dirty_if(r)
    }

    /// Runs a pattern through a procedural note generator and keeps the
    /// result.
    pub fn generate_pattern(
        &mut self,
        track_uid: TrackUid,
        pattern_uid: PatternUid,
        generator: &mut dyn NoteGenerator,
    ) -> bool {
        let r = self
            .tracks
            .apply_generator(track_uid, pattern_uid, generator);
        self.mark_dirty_if(r)
    }

    #[allow(missing_docs)]
    pub fn set_track_muted(&mut self, track_uid: TrackUid, is_muted: bool) -> bool {
        let r = self.tracks.set_track_muted(track_uid, is_muted);
        self.mark_dirty_if(r)
    }

    #[allow(missing_docs)]
    pub fn set_track_solo(&mut self, track_uid: TrackUid, is_solo: bool) -> bool {
        let r = self.tracks.set_track_solo(track_uid, is_solo);
        self.mark_dirty_if(r)
    }

    #[allow(missing_docs)]
    pub fn set_track_volume(&mut self, track_uid: TrackUid, volume: Decibels) -> bool {
        let r = self
            .tracks
            .set_track_volume(&mut self.graph, track_uid, volume);
        self.mark_dirty_if(r)
    }

    #[allow(missing_docs)]
    pub fn rename_track(&mut self, track_uid: TrackUid, title: &str) -> bool {
        let r = self.tracks.rename_track(track_uid, title);
        self.mark_dirty_if(r)
    }

    /// Selects a track. Selection isn't part of the composition, so this
    /// doesn't count as a change.
    pub fn set_current_track(&mut self, track_uid: TrackUid) -> bool {
        self.tracks.set_current_track(track_uid)
    }

    #[allow(missing_docs)]
    pub fn current_track(&self) -> Option<TrackUid> {
        self.tracks.current_track()
    }

    /// The persisted form of the composition as it stands.
    pub fn serialize_composition(&self) -> CompositionRecord {
        CompositionRecord {
            id: self.metadata.id.clone(),
            title: self.metadata.title.clone(),
            created_at: self.metadata.created_at.clone(),
            updated_at: self.metadata.updated_at.clone(),
            bpm: self.clock.tempo().0,
            volume: self.volume.0,
            tracks: self.tracks.to_records(),
        }
    }

    /// Replaces the composition. Playback stops, every live node and
    /// schedule is disposed, and the whole graph is rebuilt from `record`.
    pub fn load_composition(&mut self, record: &CompositionRecord) -> Result<()> {
        self.stop();
        self.initialize()?;
        self.tracks.teardown(&mut self.graph);
        self.tracks.set_pattern_length(self.settings.pattern_length);

        self.clock.set_tempo(Tempo(record.bpm).clamped());
        self.apply_volume(Decibels(record.volume));
        self.metadata = CompositionMetadata {
            id: record.id.clone(),
            title: record.title.clone(),
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
        };

        let sink = self.sink();
        for track in &record.tracks {
            if self
                .tracks
                .restore_track(&mut self.graph, sink, track)
                .is_none()
            {
                log::warn!("couldn't restore track '{}'", track.name);
            }
        }
        self.has_unsaved_changes = false;
        self.last_autosave = None;
        log::info!(
            "loaded composition '{}' with {} tracks",
            self.metadata.title,
            self.tracks.track_uids().len()
        );
        Ok(())
    }

    /// Replaces the composition with an empty one at the configured default
    /// tempo and volume.
    pub fn new_composition(&mut self) -> Result<()> {
        self.load_composition(&CompositionRecord {
            bpm: self.settings.default_bpm.0,
            volume: self.settings.default_volume.0,
            ..Default::default()
        })
    }

    /// Writes the composition to `store`, adopting the id and timestamps the
    /// store assigns. Returns the id.
    pub fn save_to(&mut self, store: &mut dyn CompositionStore) -> Result<String> {
        let mut record = self.serialize_composition();
        let id = store.save(&mut record)?;
        self.metadata.id = Some(id.clone());
        self.metadata.created_at = record.created_at;
        self.metadata.updated_at = record.updated_at;
        self.has_unsaved_changes = false;
        log::info!("saved composition {id}");
        Ok(id)
    }

    /// Reads a composition from `store` and loads it.
    pub fn load_from(&mut self, store: &dyn CompositionStore, id: &str) -> Result<()> {
        let record = store.load(id)?;
        self.load_composition(&record)
    }

    /// Loads whatever the store's auto-save slot holds. The result counts as
    /// unsaved, since it was never explicitly saved. An empty slot is
    /// [Error::StorageFailure].
    pub fn load_autosave(&mut self, store: &dyn CompositionStore) -> Result<()> {
        let record = store
            .load_autosave()?
            .ok_or_else(|| anyhow::anyhow!("no auto-saved composition"))?;
        self.load_composition(&record)?;
        self.mark_dirty();
        Ok(())
    }

    /// Writes the composition to the store's auto-save slot if auto-save is
    /// on, something has changed, and enough time has passed since the last
    /// auto-save. `now` is any monotonic time in seconds. The first call after
    /// a load only starts the interval. Returns whether it wrote anything.
    pub fn autosave_if_due(
        &mut self,
        store: &mut dyn CompositionStore,
        now: Seconds,
    ) -> Result<bool> {
        let last = *self.last_autosave.get_or_insert(now);
        if !self.settings.auto_save_enabled || !self.has_unsaved_changes {
            return Ok(false);
        }
        if now.0 - last.0 < self.settings.effective_auto_save_interval().0 {
            return Ok(false);
        }
        store.autosave(&self.serialize_composition())?;
        self.last_autosave = Some(now);
        log::debug!("auto-saved composition at {now}");
        Ok(true)
    }

    /// Whether anything has changed since the last save or load.
    pub fn has_unsaved_changes(&self) -> bool {
        self.has_unsaved_changes
    }

    fn mark_dirty(&mut self) {
        self.has_unsaved_changes = true;
    }

    fn mark_dirty_if(&mut self, changed: bool) -> bool {
        if changed {
            self.mark_dirty();
        }
        changed
    }

    /// Disposes every node, including the master stage, and returns to
    /// [SessionState::Uninitialized].
    pub fn shutdown(&mut self) {
        self.clock.stop();
        self.tracks.teardown(&mut self.graph);
        if let Some(master) = self.master_node.take() {
            if let Err(e) = self.graph.disconnect(master) {
                log::warn!("while disconnecting master volume: {e}");
            }
            if let Err(e) = self.graph.dispose_node(master) {
                log::warn!("while disposing master volume: {e}");
            }
        }
        self.state = SessionState::Uninitialized;
        log::info!("session shut down");
    }

    #[allow(missing_docs)]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[allow(missing_docs)]
    pub fn is_playing(&self) -> bool {
        self.state == SessionState::Playing
    }

    #[allow(missing_docs)]
    pub fn clock(&self) -> &ClockService {
        &self.clock
    }

    #[allow(missing_docs)]
    pub fn tracks(&self) -> &TrackManager {
        &self.tracks
    }

    #[allow(missing_docs)]
    pub fn metadata(&self) -> &CompositionMetadata {
        &self.metadata
    }

    #[allow(missing_docs)]
    pub fn set_title(&mut self, title: &str) {
        self.metadata.title = title.to_string();
        self.mark_dirty();
    }

    #[allow(missing_docs)]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Replaces the settings. Auto-save changes take effect immediately. The
    /// other defaults apply to compositions and patterns created afterward.
    pub fn update_settings(&mut self, settings: SessionSettings) -> &SessionSettings {
        self.settings = settings;
        self.settings.after_deser();
        self.settings.needs_save();
        self.tracks.set_pattern_length(self.settings.pattern_length);
        log::info!("settings updated");
        &self.settings
    }

    #[allow(missing_docs)]
    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// The backend, for hosts that need to pump it. Changing the topology
    /// through this bypasses the session's bookkeeping.
    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }
}
