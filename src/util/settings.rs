// Copyright (c) 2024 Mike Tsao

//! Configuration for a composition session. Intended to be serialized.

use crate::prelude::*;
use derivative::Derivative;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// The UI color scheme. The session doesn't use it, but it travels with the
/// rest of the settings so that the UI layer has one place to keep it.
#[derive(Clone, Copy, Debug, Default, Display, EnumString, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    /// Follow the system.
    #[default]
    Auto,
    #[allow(missing_docs)]
    Light,
    #[allow(missing_docs)]
    Dark,
}

impl SessionSettingsBuilder {
    /// The overridden Builder build() method.
    pub fn build(&self) -> Result<SessionSettings, SessionSettingsBuilderError> {
        match self.build_from_builder() {
            Ok(mut s) => {
                s.after_deser();
                Ok(s)
            }
            Err(e) => Err(e),
        }
    }
}

/// Contains persistent session settings. Missing fields take their defaults
/// when deserialized.
#[derive(Clone, Debug, Derivative, Builder, Serialize, Deserialize)]
#[derivative(Default, PartialEq)]
#[builder(build_fn(private, name = "build_from_builder"))]
#[serde(default, rename_all = "camelCase")]
pub struct SessionSettings {
    /// The tempo of new compositions.
    #[builder(default = "Tempo(120.0)")]
    #[derivative(Default(value = "Tempo(120.0)"))]
    pub default_bpm: Tempo,

    /// The master volume of new compositions.
    #[builder(default = "Decibels(-10.0)")]
    #[derivative(Default(value = "Decibels(-10.0)"))]
    pub default_volume: Decibels,

    #[allow(missing_docs)]
    #[builder(default = "true")]
    #[derivative(Default(value = "true"))]
    pub auto_save_enabled: bool,

    /// How often to auto-save, in milliseconds. Intervals shorter than
    /// [SessionSettings::MIN_AUTO_SAVE_INTERVAL_MS] are treated as that.
    #[serde(alias = "autoSaveInterval")]
    #[builder(default = "60000")]
    #[derivative(Default(value = "60000"))]
    pub auto_save_interval_ms: u64,

    /// How many compositions a store should keep before evicting old ones.
    #[builder(default = "50")]
    #[derivative(Default(value = "50"))]
    pub max_compositions: usize,

    #[allow(missing_docs)]
    #[builder(default)]
    pub theme: Theme,

    /// How many slots new patterns get.
    #[builder(default = "16")]
    #[derivative(Default(value = "16"))]
    pub pattern_length: usize,

    #[builder(setter(skip))]
    #[serde(skip)]
    #[derivative(PartialEq = "ignore")]
    has_been_saved: bool,
}
impl HasSettings for SessionSettings {
    fn has_been_saved(&self) -> bool {
        self.has_been_saved
    }

    fn needs_save(&mut self) {
        self.has_been_saved = false;
    }

    fn mark_clean(&mut self) {
        self.has_been_saved = true;
    }
}
impl Serializable for SessionSettings {
    fn after_deser(&mut self) {
        self.default_bpm = self.default_bpm.clamped();
        if self.pattern_length == 0 {
            self.pattern_length = 16;
        }
    }
}
impl SessionSettings {
    /// The shortest auto-save interval honored.
    pub const MIN_AUTO_SAVE_INTERVAL_MS: u64 = 5000;

    /// Parses settings from JSON. The result counts as saved, since it came
    /// from somewhere.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let mut r: Self = serde_json::from_str(json)?;
        r.after_deser();
        r.mark_clean();
        Ok(r)
    }

    /// Returns a copy with the fields present in `patch`, a JSON object in the
    /// persisted form, replacing this one's. The copy needs saving.
    pub fn merged_with(&self, patch: &serde_json::Value) -> anyhow::Result<Self> {
        let mut value = serde_json::to_value(self)?;
        if let (Some(base), Some(patch)) = (value.as_object_mut(), patch.as_object()) {
            for (key, v) in patch {
                let key = match key.as_str() {
                    "autoSaveInterval" => "autoSaveIntervalMs",
                    key => key,
                };
                base.insert(key.to_string(), v.clone());
            }
        } else {
            anyhow::bail!("settings patch must be an object");
        }
        let mut r: Self = serde_json::from_value(value)?;
        r.after_deser();
        r.needs_save();
        Ok(r)
    }

    /// The auto-save interval after applying the floor.
    pub fn effective_auto_save_interval(&self) -> Seconds {
        Seconds(self.auto_save_interval_ms.max(Self::MIN_AUTO_SAVE_INTERVAL_MS) as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let s = SessionSettings::from_json(r#"{"theme": "dark", "autoSaveInterval": 1000}"#)
            .unwrap();
        assert_eq!(s.theme, Theme::Dark);
        assert_eq!(s.default_bpm, Tempo(120.0));
        assert_eq!(s.default_volume, Decibels(-10.0));
        assert_eq!(s.max_compositions, 50);
        assert!(s.auto_save_enabled);
        assert_eq!(s.auto_save_interval_ms, 1000);
        assert_eq!(s.effective_auto_save_interval(), Seconds(5.0));
        assert!(s.has_been_saved());
    }

    #[test]
    fn builder_matches_defaults() {
        let built = SessionSettingsBuilder::default().build().unwrap();
        assert_eq!(built, SessionSettings::default());
        assert_eq!(built.effective_auto_save_interval(), Seconds(60.0));

        let custom = SessionSettingsBuilder::default()
            .default_bpm(Tempo(500.0))
            .pattern_length(0)
            .build()
            .unwrap();
        assert_eq!(custom.default_bpm, Tempo(Tempo::MAX_VALUE));
        assert_eq!(custom.pattern_length, 16);
    }

    #[test]
    fn patches_replace_only_what_they_name() {
        let s = SessionSettings::from_json(r#"{"theme": "dark"}"#).unwrap();
        let patched = s
            .merged_with(&serde_json::json!({"autoSaveEnabled": false, "autoSaveInterval": 30000}))
            .unwrap();
        assert!(!patched.auto_save_enabled);
        assert_eq!(patched.auto_save_interval_ms, 30000);
        assert_eq!(patched.theme, Theme::Dark);
        assert_eq!(patched.default_bpm, s.default_bpm);
        assert!(!patched.has_been_saved());

        let clamped = s.merged_with(&serde_json::json!({"defaultBpm": 10})).unwrap();
        assert_eq!(clamped.default_bpm, Tempo(Tempo::MIN_VALUE));
        assert!(s.merged_with(&serde_json::json!([1, 2])).is_err());
        assert!(s.merged_with(&serde_json::json!({"theme": "plaid"})).is_err());
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(SessionSettings::from_json("{not json").is_err());
    }
}
