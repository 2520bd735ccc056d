// Copyright (c) 2024 Mike Tsao

//! The persisted form of a composition. Nothing in here refers to a live
//! node; ids are plain strings so that records written by other tools load
//! too.

use crate::composition::Note;
use derivative::Derivative;
use serde::{Deserialize, Serialize};

/// A whole composition as the storage collaborator sees it.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CompositionRecord {
    /// Assigned by the store on first save.
    pub id: Option<String>,
    #[allow(missing_docs)]
    #[derivative(Default(value = "CompositionRecord::UNTITLED.to_string()"))]
    pub title: String,
    /// Stamped by the store.
    pub created_at: Option<String>,
    /// Stamped by the store.
    pub updated_at: Option<String>,
    /// Beats per minute.
    #[derivative(Default(value = "120.0"))]
    pub bpm: f64,
    /// Master volume in decibels.
    #[derivative(Default(value = "-10.0"))]
    pub volume: f64,
    #[allow(missing_docs)]
    pub tracks: Vec<TrackRecord>,
}
impl CompositionRecord {
    /// The title new compositions get.
    pub const UNTITLED: &'static str = "Untitled Composition";
}

/// One track of a [CompositionRecord].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackRecord {
    #[allow(missing_docs)]
    pub id: String,
    #[allow(missing_docs)]
    pub name: String,
    /// The instrument's type name, such as `synth` or `fmSynth`.
    #[serde(alias = "instrument")]
    pub instrument_type: String,
    /// The instrument's parameters, if they differ from its defaults.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument_options: Option<serde_json::Value>,
    #[allow(missing_docs)]
    pub muted: bool,
    #[allow(missing_docs)]
    pub solo: bool,
    /// Trim in decibels.
    pub volume: f64,
    #[allow(missing_docs)]
    pub patterns: Vec<PatternRecord>,
    /// In signal order.
    pub effects: Vec<EffectRecord>,
}

/// One pattern of a [TrackRecord].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternRecord {
    #[allow(missing_docs)]
    pub id: String,
    #[allow(missing_docs)]
    pub notes: Vec<Note>,
    /// Slot count, if not the session default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
}

/// One effect of a [TrackRecord].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectRecord {
    /// The effect's type name, such as `reverb`.
    #[serde(rename = "type")]
    pub effect_type: String,
    #[allow(missing_docs)]
    pub options: serde_json::Value,
}
