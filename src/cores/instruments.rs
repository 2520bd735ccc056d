// Copyright (c) 2024 Mike Tsao

use super::options_or_default;
use crate::{error::Error, prelude::*};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// The closed set of synthesizer variants an [Instrument](crate::Instrument)
/// can be. The string forms are the names that appear in composition records.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum InstrumentType {
    /// A single oscillator through an ADSR envelope.
    #[default]
    #[strum(serialize = "synth")]
    Synth,
    /// Amplitude modulation of one oscillator by another.
    #[strum(serialize = "amSynth")]
    AmSynth,
    /// Frequency modulation of one oscillator by another.
    #[strum(serialize = "fmSynth")]
    FmSynth,
    /// A pitch-swept sine for kick drums and toms.
    #[strum(serialize = "membraneSynth")]
    MembraneSynth,
    /// Inharmonic FM partials for cymbals and bells.
    #[strum(serialize = "metalSynth")]
    MetalSynth,
    /// Karplus-Strong plucked string.
    #[strum(to_string = "pluckSynth", serialize = "pluck")]
    #[serde(alias = "pluck")]
    PluckSynth,
}
impl InstrumentType {
    /// Parses a type name strictly.
    pub fn parse(name: &str) -> crate::error::Result<Self> {
        name.parse().map_err(|_| Error::UnsupportedVariant {
            kind: "instrument",
            name: name.to_string(),
        })
    }

    /// Parses a type name, falling back to [InstrumentType::Synth] for names
    /// that aren't recognized.
    pub fn parse_or_default(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|e| {
            log::warn!("{e}; falling back to {}", Self::default());
            Self::default()
        })
    }
}

/// Oscillator waveforms.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[allow(missing_docs)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

/// Which waveform an oscillator produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillatorParams {
    /// The waveform.
    #[serde(rename = "type")]
    pub waveform: Waveform,
}

/// Attack/decay/sustain/release. Attack, decay and release are durations in
/// seconds; sustain is a level.
#[derive(Clone, Copy, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default)]
pub struct EnvelopeParams {
    #[allow(missing_docs)]
    #[derivative(Default(value = "0.1"))]
    pub attack: f64,
    #[allow(missing_docs)]
    #[derivative(Default(value = "0.2"))]
    pub decay: f64,
    #[allow(missing_docs)]
    #[derivative(Default(value = "0.5.into()"))]
    pub sustain: Normal,
    #[allow(missing_docs)]
    #[derivative(Default(value = "0.8"))]
    pub release: f64,
}
impl EnvelopeParams {
    fn percussive(decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            attack: 0.001,
            decay,
            sustain: sustain.into(),
            release,
        }
    }
}

/// Parameters for [InstrumentType::Synth].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthParams {
    #[allow(missing_docs)]
    pub oscillator: OscillatorParams,
    #[allow(missing_docs)]
    pub envelope: EnvelopeParams,
}

/// Parameters shared by the two-operator variants, [InstrumentType::AmSynth]
/// and [InstrumentType::FmSynth].
#[derive(Clone, Copy, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ModulationSynthParams {
    /// The carrier.
    pub oscillator: OscillatorParams,
    #[allow(missing_docs)]
    pub envelope: EnvelopeParams,
    /// Ratio of modulator frequency to carrier frequency.
    #[derivative(Default(value = "3.0"))]
    pub harmonicity: f64,
    /// Depth of frequency modulation. Ignored by the AM variant.
    #[derivative(Default(value = "10.0"))]
    pub modulation_index: f64,
}

/// Parameters for [InstrumentType::MembraneSynth].
#[derive(Clone, Copy, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MembraneSynthParams {
    #[allow(missing_docs)]
    pub oscillator: OscillatorParams,
    #[allow(missing_docs)]
    #[derivative(Default(value = "EnvelopeParams::percussive(0.4, 0.01, 1.4)"))]
    pub envelope: EnvelopeParams,
    /// Seconds the pitch sweep takes.
    #[derivative(Default(value = "0.05"))]
    pub pitch_decay: f64,
    /// How many octaves above the note the sweep starts.
    #[derivative(Default(value = "10.0"))]
    pub octaves: f64,
}

/// Parameters for [InstrumentType::MetalSynth].
#[derive(Clone, Copy, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MetalSynthParams {
    #[allow(missing_docs)]
    #[derivative(Default(value = "EnvelopeParams::percussive(1.4, 0.0, 0.2)"))]
    pub envelope: EnvelopeParams,
    #[allow(missing_docs)]
    #[derivative(Default(value = "5.1"))]
    pub harmonicity: f64,
    #[allow(missing_docs)]
    #[derivative(Default(value = "32.0"))]
    pub modulation_index: f64,
    /// Highpass cutoff in Hz.
    #[derivative(Default(value = "4000.0"))]
    pub resonance: f64,
    #[allow(missing_docs)]
    #[derivative(Default(value = "1.5"))]
    pub octaves: f64,
}

/// Parameters for [InstrumentType::PluckSynth].
#[derive(Clone, Copy, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "camelCase")]
pub struct PluckSynthParams {
    /// Amount of noise at the start of the pluck.
    #[derivative(Default(value = "1.0"))]
    pub attack_noise: f64,
    /// Lowpass cutoff in Hz.
    #[derivative(Default(value = "4000.0"))]
    pub dampening: f64,
    #[allow(missing_docs)]
    #[derivative(Default(value = "0.7.into()"))]
    pub resonance: Normal,
    #[allow(missing_docs)]
    #[derivative(Default(value = "1.0"))]
    pub release: f64,
}

/// An instrument variant together with its parameters. Building a live node
/// from one of these is a single exhaustive match in the backend.
#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum InstrumentKind {
    Synth(SynthParams),
    AmSynth(ModulationSynthParams),
    FmSynth(ModulationSynthParams),
    MembraneSynth(MembraneSynthParams),
    MetalSynth(MetalSynthParams),
    PluckSynth(PluckSynthParams),
}
impl Default for InstrumentKind {
    fn default() -> Self {
        Self::Synth(SynthParams::default())
    }
}
impl InstrumentKind {
    /// Builds the given variant from an options object. Missing fields take
    /// the variant's defaults; an options object that doesn't fit the
    /// variant at all is replaced by the defaults.
    pub fn new_with(instrument_type: InstrumentType, options: Option<&serde_json::Value>) -> Self {
        let name: &'static str = instrument_type.into();
        match instrument_type {
            InstrumentType::Synth => Self::Synth(options_or_default(name, options)),
            InstrumentType::AmSynth => Self::AmSynth(options_or_default(name, options)),
            InstrumentType::FmSynth => Self::FmSynth(options_or_default(name, options)),
            InstrumentType::MembraneSynth => {
                Self::MembraneSynth(options_or_default(name, options))
            }
            InstrumentType::MetalSynth => Self::MetalSynth(options_or_default(name, options)),
            InstrumentType::PluckSynth => Self::PluckSynth(options_or_default(name, options)),
        }
    }

    /// Like [InstrumentKind::new_with()], but starting from a type name that
    /// might not be recognized.
    pub fn new_with_name(name: &str, options: Option<&serde_json::Value>) -> Self {
        Self::new_with(InstrumentType::parse_or_default(name), options)
    }

    #[allow(missing_docs)]
    pub fn instrument_type(&self) -> InstrumentType {
        match self {
            InstrumentKind::Synth(_) => InstrumentType::Synth,
            InstrumentKind::AmSynth(_) => InstrumentType::AmSynth,
            InstrumentKind::FmSynth(_) => InstrumentType::FmSynth,
            InstrumentKind::MembraneSynth(_) => InstrumentType::MembraneSynth,
            InstrumentKind::MetalSynth(_) => InstrumentType::MetalSynth,
            InstrumentKind::PluckSynth(_) => InstrumentType::PluckSynth,
        }
    }

    /// The parameters as an options object, the form they take in a
    /// composition record.
    pub fn options(&self) -> serde_json::Value {
        let r = match self {
            InstrumentKind::Synth(p) => serde_json::to_value(p),
            InstrumentKind::AmSynth(p) | InstrumentKind::FmSynth(p) => serde_json::to_value(p),
            InstrumentKind::MembraneSynth(p) => serde_json::to_value(p),
            InstrumentKind::MetalSynth(p) => serde_json::to_value(p),
            InstrumentKind::PluckSynth(p) => serde_json::to_value(p),
        };
        r.unwrap_or_default()
    }
}
