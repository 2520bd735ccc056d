// Copyright (c) 2024 Mike Tsao

use super::{EffectUid, InstrumentUid};
use crate::{composition::PatternUid, prelude::*, types::declare_uid};
use delegate::delegate;
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use synonym::Synonym;

/// Newtype for track title string.
#[derive(Synonym, Derivative, Serialize, Deserialize)]
#[derivative(Default)]
#[synonym(skip(Default))]
#[serde(rename_all = "kebab-case")]
pub struct TrackTitle(#[derivative(Default(value = "\"Untitled\".to_string()"))] pub String);

declare_uid!(
    /// Identifies a track.
    TrackUid
);

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackUidFactory(UidFactory<TrackUid>);
impl Default for TrackUidFactory {
    fn default() -> Self {
        Self(UidFactory::<TrackUid>::new(1))
    }
}
impl TrackUidFactory {
    delegate! {
        to self.0 {
            pub fn mint_next(&self) -> TrackUid;
            pub fn notify_externally_minted_uid(&self, uid: TrackUid);
            pub fn is_unminted(&self, uid: TrackUid) -> bool;
        }
    }
}

/// A [Track] pairs one instrument with an ordered effect chain and the
/// patterns that play it. It refers to its instrument and effects by id only;
/// the registries own them.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    #[allow(missing_docs)]
    pub uid: TrackUid,
    #[allow(missing_docs)]
    pub title: TrackTitle,
    /// The one instrument this track plays.
    pub instrument_uid: InstrumentUid,
    #[allow(missing_docs)]
    pub is_muted: bool,
    #[allow(missing_docs)]
    pub is_solo: bool,
    /// Trim applied to the instrument's output.
    pub volume: Decibels,
    /// Patterns in creation order.
    pub pattern_uids: Vec<PatternUid>,
    /// Effects in signal order.
    pub effect_uids: Vec<EffectUid>,
}
impl Track {
    /// Creates an unmuted, unsoloed track at unity trim with no patterns or
    /// effects.
    pub fn new_with(uid: TrackUid, title: TrackTitle, instrument_uid: InstrumentUid) -> Self {
        Self {
            uid,
            title,
            instrument_uid,
            is_muted: false,
            is_solo: false,
            volume: Decibels::UNITY,
            pattern_uids: Vec::default(),
            effect_uids: Vec::default(),
        }
    }
}
