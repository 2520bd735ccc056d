// Copyright (c) 2024 Mike Tsao

use float_cmp::approx_eq;
use more_asserts::assert_ge;
use serde_json::json;
use soundscape::{
    cores::{EffectKind, EffectType, InstrumentType},
    prelude::*,
    Error,
};

fn session() -> CompositionSession<VirtualGraph> {
    let _ = env_logger::builder().is_test(true).try_init();
    CompositionSession::new_with(VirtualGraph::new(), SessionSettings::default())
}

#[test]
fn toggle_play_bootstraps_an_empty_session() {
    let mut s = session();
    assert_eq!(s.state(), SessionState::Uninitialized);
    assert_eq!(s.toggle_play().unwrap(), SessionState::Playing);
    assert_eq!(s.tracks().track_uids().len(), 1, "one default track");
    assert_eq!(s.tracks().instruments().len(), 1);
    let t = s.tracks().track_uids()[0];
    assert_eq!(s.tracks().track(t).unwrap().title.0, "Track 1");
    assert_eq!(s.current_track(), Some(t));

    assert_eq!(s.toggle_play().unwrap(), SessionState::Paused);
    assert_eq!(s.toggle_play().unwrap(), SessionState::Playing);
    assert_eq!(s.tracks().track_uids().len(), 1, "still just the one");
}

#[test]
fn stop_always_returns_to_ready_at_the_origin() {
    let mut s = session();
    s.stop();
    assert_eq!(s.state(), SessionState::Uninitialized, "no-op before init");

    s.toggle_play().unwrap();
    s.advance(MusicalTime::ONE_BEAT);
    s.stop();
    assert_eq!(s.state(), SessionState::Ready);
    assert_eq!(s.clock().position(), MusicalTime::START);

    s.toggle_play().unwrap();
    s.advance(MusicalTime::ONE_BEAT);
    s.toggle_play().unwrap();
    assert_eq!(s.state(), SessionState::Paused);
    s.stop();
    assert_eq!(s.state(), SessionState::Ready);
    assert_eq!(s.clock().position(), MusicalTime::START);

    s.stop();
    assert_eq!(s.state(), SessionState::Ready);
    assert_eq!(s.clock().state(), TransportState::Idle);
}

#[test]
fn structural_operations_initialize_lazily() {
    let mut s = session();
    let t = s.create_track(Some("Lead")).unwrap();
    assert_eq!(s.state(), SessionState::Ready);
    assert_eq!(s.tracks().track(t).unwrap().title.0, "Lead");
}

#[test]
fn saved_compositions_load_back_identically() {
    let mut s = session();
    s.set_title("Night Drive");
    s.set_bpm(Tempo(96.0));
    s.set_volume(Decibels(-6.0));
    let lead = s.create_track(Some("Lead")).unwrap();
    s.add_effect(lead, EffectKind::new_with(EffectType::Delay, None));
    s.add_effect(lead, EffectKind::new_with(EffectType::Reverb, None));
    s.create_pattern(lead, vec![Note::new_with(Pitch::C4, 0, NoteValue::Eighth)]);
    let bass = s.create_track(Some("Bass")).unwrap();
    s.set_track_muted(bass, true);
    s.set_track_volume(bass, Decibels(-3.0));
    assert!(s.has_unsaved_changes());

    let mut store = InMemoryCompositionStore::default();
    let id = s.save_to(&mut store).unwrap();
    assert!(!s.has_unsaved_changes());
    assert_eq!(s.metadata().id.as_deref(), Some(id.as_str()));
    let saved = s.serialize_composition();

    let mut other = session();
    other.load_from(&store, &id).unwrap();
    assert_eq!(other.serialize_composition(), saved);
    assert!(approx_eq!(f64, other.bpm().0, 96.0));
    assert_eq!(other.volume(), Decibels(-6.0));
    assert!(!other.has_unsaved_changes());
    assert_eq!(other.state(), SessionState::Ready);

    // One master stage, two instruments, two effects.
    assert_eq!(other.graph().live_node_count(), 5);
}

#[test]
fn loading_tears_down_everything_first() {
    let mut s = session();
    for _ in 0..3 {
        let t = s.create_track(None).unwrap();
        s.add_effect(t, EffectKind::default());
        s.create_pattern(t, vec![Note::default()]);
    }
    s.toggle_play().unwrap();
    assert_eq!(s.graph().live_node_count(), 7);

    let record: CompositionRecord = serde_json::from_value(json!({
        "title": "Imported",
        "bpm": 140,
        "tracks": [{
            "id": "track-a",
            "name": "Only",
            "instrument": "pluck",
            "patterns": [{"id": "p", "notes": [{"pitch": "A4", "time": 2, "duration": "16n"}]}],
            "effects": [{"type": "chorus", "options": {"depth": 0.2}}]
        }]
    }))
    .unwrap();
    s.load_composition(&record).unwrap();

    assert_eq!(s.state(), SessionState::Ready, "loading stops playback");
    assert_eq!(s.tracks().track_uids().len(), 1);
    assert_eq!(s.tracks().scheduler().live_sequence_count(), 1);
    assert_eq!(s.graph().live_node_count(), 3);
    assert_eq!(s.metadata().title, "Imported");

    let t = s.tracks().track_uids()[0];
    let track = s.tracks().track(t).unwrap();
    let instrument = s.tracks().instruments().get(track.instrument_uid).unwrap();
    assert_eq!(instrument.instrument_type(), InstrumentType::PluckSynth);
    let effect = s.tracks().effects().get(track.effect_uids[0]).unwrap();
    assert_eq!(effect.effect_type(), EffectType::Chorus);
    assert_eq!(effect.kind().options()["depth"], json!(0.2));

    s.toggle_play().unwrap();
    assert_eq!(s.advance(MusicalTime::ONE_BEAT), 1);
    assert_eq!(s.graph().triggers().last().unwrap().pitch, Pitch::A4);
}

#[test]
fn unknown_variants_load_with_defaults() {
    let mut s = session();
    let record: CompositionRecord = serde_json::from_value(json!({
        "tracks": [{
            "name": "Odd",
            "instrumentType": "theremin",
            "instrumentOptions": {"envelope": "not an object"},
            "effects": [{"type": "bitcrusher", "options": {}}]
        }]
    }))
    .unwrap();
    s.load_composition(&record).unwrap();
    let t = s.tracks().track_uids()[0];
    let track = s.tracks().track(t).unwrap();
    assert_eq!(
        s.tracks()
            .instruments()
            .get(track.instrument_uid)
            .unwrap()
            .instrument_type(),
        InstrumentType::Synth
    );
    assert_eq!(
        s.tracks()
            .effects()
            .get(track.effect_uids[0])
            .unwrap()
            .effect_type(),
        EffectType::Reverb
    );
}

#[test]
fn new_composition_starts_fresh() {
    let mut s = session();
    let t = s.create_track(None).unwrap();
    s.set_bpm(Tempo(180.0));
    s.create_pattern(t, vec![Note::default()]);
    s.new_composition().unwrap();

    assert!(s.tracks().track_uids().is_empty());
    assert_eq!(s.current_track(), None);
    assert_eq!(s.bpm(), Tempo(120.0));
    assert_eq!(s.volume(), Decibels(-10.0));
    assert_eq!(s.metadata().title, "Untitled Composition");
    assert_eq!(s.metadata().id, None);
    assert_eq!(s.graph().live_node_count(), 1, "just the master stage");
}

#[test]
fn storage_failures_reach_the_caller() {
    let mut s = session();
    let store = InMemoryCompositionStore::default();
    assert!(matches!(
        s.load_from(&store, "missing"),
        Err(Error::StorageFailure(_))
    ));
    assert_eq!(s.state(), SessionState::Uninitialized, "nothing was torn down");
}

#[test]
fn autosave_waits_for_changes_and_the_interval() {
    let settings = SessionSettingsBuilder::default()
        .auto_save_interval_ms(10000)
        .build()
        .unwrap();
    let mut s = CompositionSession::new_with(VirtualGraph::new(), settings);
    let mut store = InMemoryCompositionStore::default();

    assert!(!s.autosave_if_due(&mut store, Seconds(0.0)).unwrap(), "clean");
    s.create_track(None);
    assert!(
        !s.autosave_if_due(&mut store, Seconds(1.0)).unwrap(),
        "the first interval hasn't passed"
    );
    assert!(s.autosave_if_due(&mut store, Seconds(10.0)).unwrap());
    assert_eq!(store.autosaved().unwrap().tracks.len(), 1);
    assert!(!s.autosave_if_due(&mut store, Seconds(15.0)).unwrap(), "too soon");
    assert!(s.autosave_if_due(&mut store, Seconds(21.0)).unwrap());
    assert!(s.has_unsaved_changes(), "auto-save isn't a real save");
    assert!(store.is_empty());

    s.save_to(&mut store).unwrap();
    assert!(!s.autosave_if_due(&mut store, Seconds(100.0)).unwrap());
}

#[test]
fn first_autosave_waits_out_the_floor() {
    let settings = SessionSettings::from_json(r#"{"autoSaveInterval": 0}"#).unwrap();
    let mut s = CompositionSession::new_with(VirtualGraph::new(), settings);
    let mut store = InMemoryCompositionStore::default();
    s.create_track(None);
    assert!(!s.autosave_if_due(&mut store, Seconds(100.0)).unwrap());
    assert!(!s.autosave_if_due(&mut store, Seconds(104.0)).unwrap());
    assert!(s.autosave_if_due(&mut store, Seconds(105.0)).unwrap());
}

#[test]
fn autosaved_compositions_restore_as_unsaved() {
    let mut s = session();
    let mut store = InMemoryCompositionStore::default();
    assert!(!store.has_autosave());
    assert!(matches!(
        s.load_autosave(&store),
        Err(Error::StorageFailure(_))
    ));

    s.set_title("Draft");
    let t = s.create_track(Some("Lead")).unwrap();
    s.create_pattern(t, vec![Note::default()]);
    assert!(!s.autosave_if_due(&mut store, Seconds(0.0)).unwrap());
    assert!(s.autosave_if_due(&mut store, Seconds(60.0)).unwrap());
    assert!(store.has_autosave());

    let mut other = session();
    other.load_autosave(&store).unwrap();
    assert_eq!(other.metadata().title, "Draft");
    assert_eq!(other.tracks().track_uids().len(), 1);
    assert_eq!(other.tracks().scheduler().live_sequence_count(), 1);
    assert!(other.has_unsaved_changes(), "never explicitly saved");
}

#[test]
fn settings_can_change_while_running() {
    let mut s = session();
    let mut store = InMemoryCompositionStore::default();
    let t = s.create_track(None).unwrap();
    assert!(!s.autosave_if_due(&mut store, Seconds(0.0)).unwrap());

    let patch = json!({"autoSaveEnabled": false, "patternLength": 8, "defaultBpm": 90});
    let updated = s.settings().merged_with(&patch).unwrap();
    s.update_settings(updated);
    assert!(!s.settings().auto_save_enabled);
    assert!(!s.autosave_if_due(&mut store, Seconds(1000.0)).unwrap());
    assert!(!store.has_autosave());

    assert_eq!(s.bpm(), Tempo(120.0), "the open composition keeps its tempo");
    let p = s.create_pattern(t, vec![Note::default()]).unwrap();
    assert_eq!(s.tracks().scheduler().pattern(p).unwrap().length(), 8);
    s.new_composition().unwrap();
    assert_eq!(s.bpm(), Tempo(90.0));
}

#[test]
fn ids_never_repeat_across_reloads() {
    let mut s = session();
    let old = s.create_track(None).unwrap();
    s.new_composition().unwrap();
    let new = s.create_track(None).unwrap();
    assert_ne!(old, new);
    assert!(!s.set_track_muted(old, true), "a stale id names nothing");
    assert!(!s.tracks().track(new).unwrap().is_muted);

    let mut store = InMemoryCompositionStore::default();
    let id = s.save_to(&mut store).unwrap();
    s.load_from(&store, &id).unwrap();
    let reloaded = s.tracks().track_uids()[0];
    assert_ne!(reloaded, new, "reloading in the same session mints fresh ids");
    assert!(!s.rename_track(new, "stale"));
}

#[test]
fn out_of_range_pitches_are_rejected_on_load() {
    let r: std::result::Result<CompositionRecord, _> = serde_json::from_value(json!({
        "tracks": [{
            "name": "Broken",
            "patterns": [{"id": "p", "notes": [{"pitch": "C32767", "time": 0, "duration": "16n"}]}]
        }]
    }));
    assert!(r.is_err());
}

#[test]
fn default_sessions_reach_the_hardware_output() {
    let mut s: CompositionSession<VirtualGraph> = CompositionSession::default();
    let t = s.create_track(None).unwrap();
    let instrument = s.tracks().track(t).unwrap().instrument_uid;
    let node = s.tracks().instruments().get(instrument).unwrap().node();
    assert_eq!(
        s.graph().path_from(node),
        vec![node, s.sink(), s.graph().destination()]
    );
    assert_eq!(s.graph().live_node_count(), 2);
}

#[test]
fn autosave_can_be_disabled() {
    let settings = SessionSettings::from_json(r#"{"autoSaveEnabled": false}"#).unwrap();
    let mut s = CompositionSession::new_with(VirtualGraph::new(), settings);
    let mut store = InMemoryCompositionStore::default();
    s.create_track(None);
    assert!(!s.autosave_if_due(&mut store, Seconds(1000.0)).unwrap());
    assert!(store.autosaved().is_none());
}

#[test]
fn track_selection_falls_back_to_the_first_track() {
    let mut s = session();
    let a = s.create_track(None).unwrap();
    let b = s.create_track(None).unwrap();
    let c = s.create_track(None).unwrap();
    assert_eq!(s.tracks().track(c).unwrap().title.0, "Track 3");
    assert!(s.set_current_track(c));
    assert!(s.remove_track(c));
    assert_eq!(s.current_track(), Some(a));
    assert!(s.remove_track(a));
    assert_eq!(s.current_track(), Some(b));
    assert!(s.remove_track(b));
    assert_eq!(s.current_track(), None);
}

#[test]
fn edits_while_playing_keep_the_session_consistent() {
    let mut s = session();
    s.toggle_play().unwrap();
    let t = s.tracks().track_uids()[0];
    let p = s.create_pattern(t, vec![Note::default()]).unwrap();
    let mut issued = 0;
    for i in 0..32 {
        issued += s.advance(MusicalTime::ONE_PART);
        match i {
            3 => {
                s.add_effect(t, EffectKind::new_with(EffectType::Delay, None));
            }
            9 => {
                let notes = vec![
                    Note::default(),
                    Note::new_with(Pitch::A4, 8, NoteValue::Quarter),
                ];
                s.update_pattern(t, p, notes);
            }
            17 => {
                s.remove_track(t);
            }
            _ => {}
        }
    }
    assert_ge!(issued, 2);
    assert_eq!(s.graph().live_node_count(), 1);
    assert!(s.tracks().track_uids().is_empty());
}
