// Copyright (c) 2024 Mike Tsao

use super::options_or_default;
use crate::error::Error;
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// The closed set of effect variants.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EffectType {
    /// Diffusion. Its node needs a precomputed impulse response before it
    /// can be connected.
    #[default]
    Reverb,
    /// Feedback delay.
    Delay,
    /// Waveshaping nonlinearity.
    Distortion,
    /// Modulated short delay.
    Chorus,
}
impl EffectType {
    /// Parses a type name strictly.
    pub fn parse(name: &str) -> crate::error::Result<Self> {
        name.parse().map_err(|_| Error::UnsupportedVariant {
            kind: "effect",
            name: name.to_string(),
        })
    }

    /// Parses a type name, falling back to [EffectType::Reverb] for names that
    /// aren't recognized.
    pub fn parse_or_default(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|e| {
            log::warn!("{e}; falling back to {}", Self::default());
            Self::default()
        })
    }
}

/// Parameters for [EffectType::Reverb].
#[derive(Clone, Copy, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ReverbParams {
    /// Length of the impulse response, in seconds.
    #[derivative(Default(value = "1.5"))]
    pub decay: f64,
    /// Seconds before the reverberation starts.
    #[derivative(Default(value = "0.01"))]
    pub pre_delay: f64,
}

/// Parameters for [EffectType::Delay]. `feedback` must stay below 1.0 or the
/// delay line runs away; callers clamp it, the registry doesn't.
#[derive(Clone, Copy, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "camelCase")]
pub struct DelayParams {
    /// Seconds between repeats.
    #[derivative(Default(value = "0.25"))]
    pub delay_time: f64,
    /// Ratio of each repeat to the one before.
    #[derivative(Default(value = "0.5"))]
    pub feedback: f64,
}

/// Parameters for [EffectType::Distortion].
#[derive(Clone, Copy, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default)]
pub struct DistortionParams {
    /// Amount of distortion, 0.0 to 1.0.
    #[derivative(Default(value = "0.4"))]
    pub distortion: f64,
}

/// Parameters for [EffectType::Chorus].
#[derive(Clone, Copy, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ChorusParams {
    /// LFO rate in Hz.
    #[derivative(Default(value = "1.5"))]
    pub frequency: f64,
    /// Base delay in milliseconds.
    #[derivative(Default(value = "3.5"))]
    pub delay_time: f64,
    #[allow(missing_docs)]
    #[derivative(Default(value = "0.7"))]
    pub depth: f64,
}

/// An effect variant together with its parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum EffectKind {
    Reverb(ReverbParams),
    Delay(DelayParams),
    Distortion(DistortionParams),
    Chorus(ChorusParams),
}
impl Default for EffectKind {
    fn default() -> Self {
        Self::Reverb(ReverbParams::default())
    }
}
impl EffectKind {
    /// Builds the given variant from an options object, filling in defaults.
    pub fn new_with(effect_type: EffectType, options: Option<&serde_json::Value>) -> Self {
        let name: &'static str = effect_type.into();
        match effect_type {
            EffectType::Reverb => Self::Reverb(options_or_default(name, options)),
            EffectType::Delay => Self::Delay(options_or_default(name, options)),
            EffectType::Distortion => Self::Distortion(options_or_default(name, options)),
            EffectType::Chorus => Self::Chorus(options_or_default(name, options)),
        }
    }

    /// Like [EffectKind::new_with()], but starting from a type name that might
    /// not be recognized.
    pub fn new_with_name(name: &str, options: Option<&serde_json::Value>) -> Self {
        Self::new_with(EffectType::parse_or_default(name), options)
    }

    #[allow(missing_docs)]
    pub fn effect_type(&self) -> EffectType {
        match self {
            EffectKind::Reverb(_) => EffectType::Reverb,
            EffectKind::Delay(_) => EffectType::Delay,
            EffectKind::Distortion(_) => EffectType::Distortion,
            EffectKind::Chorus(_) => EffectType::Chorus,
        }
    }

    /// Whether a live node of this kind needs buffers computed before it can
    /// be connected.
    pub fn requires_precompute(&self) -> bool {
        matches!(self, EffectKind::Reverb(_))
    }

    /// The parameters as an options object.
    pub fn options(&self) -> serde_json::Value {
        let r = match self {
            EffectKind::Reverb(p) => serde_json::to_value(p),
            EffectKind::Delay(p) => serde_json::to_value(p),
            EffectKind::Distortion(p) => serde_json::to_value(p),
            EffectKind::Chorus(p) => serde_json::to_value(p),
        };
        r.unwrap_or_default()
    }
}
