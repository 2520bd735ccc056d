// Copyright (c) 2024 Mike Tsao

//! Handles wall-clock and musical time.

use core::{
    fmt::{self, Display},
    ops::{Add, Div, Mul, Range, Sub},
};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};

/// Beats per minute.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Derivative, PartialEq, PartialOrd)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case")]
pub struct Tempo(#[derivative(Default(value = "120.0"))] pub f64);
impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:0.2} BPM", self.0))
    }
}
impl From<f64> for Tempo {
    fn from(value: f64) -> Self {
        Self(value)
    }
}
impl From<u16> for Tempo {
    fn from(value: u16) -> Self {
        Self(value as f64)
    }
}
impl From<Tempo> for f64 {
    fn from(value: Tempo) -> Self {
        value.0
    }
}
impl Tempo {
    /// The largest tempo the UI offers. Values are clamped by the caller.
    pub const MAX_VALUE: f64 = 200.0;

    /// The smallest tempo the UI offers.
    pub const MIN_VALUE: f64 = 40.0;

    /// Beats per second.
    pub fn bps(&self) -> f64 {
        self.0 / 60.0
    }

    /// MIN..=MAX
    pub const fn range() -> core::ops::RangeInclusive<f64> {
        Self::MIN_VALUE..=Self::MAX_VALUE
    }

    /// Returns a copy clamped to [Tempo::range()]. The clock itself never
    /// clamps; this is for callers that gatekeep user input.
    pub fn clamped(&self) -> Self {
        Self(self.0.clamp(Self::MIN_VALUE, Self::MAX_VALUE))
    }
}

/// Represents the [seconds](https://en.wikipedia.org/wiki/Second) unit of time.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Seconds(pub f64);
impl Seconds {
    /// Zero seconds.
    pub const fn zero() -> Seconds {
        Seconds(0.0)
    }
}
impl From<f64> for Seconds {
    fn from(value: f64) -> Self {
        Self(value)
    }
}
impl From<Seconds> for f64 {
    fn from(value: Seconds) -> Self {
        value.0
    }
}
impl Add for Seconds {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}
impl Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}s", self.0)
    }
}

/// [MusicalTime] is the universal unit of time. It is in terms of musical
/// beats, where a beat is a quarter note. A "part" is a sixteenth note (a
/// quarter of a beat), and a "unit" is 1/16384 of a part. Thus, beats are
/// divided into 65,536 units.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MusicalTime(usize);
#[allow(missing_docs)]
impl MusicalTime {
    /// A part is a sixteenth note.
    pub const PARTS_IN_BEAT: usize = 4;
    pub const UNITS_IN_PART: usize = 16384;
    pub const UNITS_IN_BEAT: usize = Self::PARTS_IN_BEAT * Self::UNITS_IN_PART;

    pub const DURATION_WHOLE: MusicalTime = Self::new_with_beats(4);
    pub const DURATION_HALF: MusicalTime = Self::new_with_beats(2);
    pub const DURATION_QUARTER: MusicalTime = Self::new_with_beats(1);
    pub const DURATION_EIGHTH: MusicalTime = Self::new_with_parts(2);
    pub const DURATION_SIXTEENTH: MusicalTime = Self::new_with_parts(1);
    pub const DURATION_ZERO: MusicalTime = Self::START;

    pub const ONE_PART: MusicalTime = Self::new_with_parts(1);
    pub const ONE_UNIT: MusicalTime = Self::new_with_units(1);
    pub const ONE_BEAT: MusicalTime = Self::new_with_beats(1);

    pub const START: MusicalTime = Self::new_with_units(0);

    // The entire number expressed in beats.
    pub fn total_beats(&self) -> usize {
        self.0 / Self::UNITS_IN_BEAT
    }

    /// The position as a fractional number of beats (quarter notes).
    pub fn as_beats(&self) -> f64 {
        self.0 as f64 / Self::UNITS_IN_BEAT as f64
    }

    // The entire number expressed in parts.
    pub fn total_parts(&self) -> usize {
        self.0 / Self::UNITS_IN_PART
    }

    pub const fn total_units(&self) -> usize {
        self.0
    }

    pub const fn beats_to_units(beats: usize) -> usize {
        beats * Self::UNITS_IN_BEAT
    }

    pub const fn parts_to_units(parts: usize) -> usize {
        parts * Self::UNITS_IN_PART
    }

    pub const fn new_with_beats(beats: usize) -> Self {
        Self::new_with_units(Self::beats_to_units(beats))
    }

    pub fn new_with_fractional_beats(beats: f64) -> Self {
        Self::new_with_units((beats.max(0.0) * Self::UNITS_IN_BEAT as f64).round() as usize)
    }

    pub const fn new_with_parts(parts: usize) -> Self {
        Self::new_with_units(Self::parts_to_units(parts))
    }

    pub const fn new_with_units(units: usize) -> Self {
        Self(units)
    }

    /// How long this span lasts in wall-clock time at the given [Tempo].
    pub fn as_seconds(&self, tempo: Tempo) -> Seconds {
        Seconds(self.as_beats() / tempo.bps())
    }

    /// How much musical time elapses over the given wall-clock span.
    pub fn from_seconds(seconds: Seconds, tempo: Tempo) -> Self {
        Self::new_with_fractional_beats(seconds.0 * tempo.bps())
    }

    /// Returns true if the value is zero. This is valid because we sometimes
    /// use [MusicalTime] to represent durations from time zero.
    pub const fn is_empty(&self) -> bool {
        self.0 == MusicalTime::START.0
    }
}
impl Display for MusicalTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:5}.{}.{:05}",
            self.total_beats() + 1,
            self.total_parts() % Self::PARTS_IN_BEAT,
            self.0 % Self::UNITS_IN_PART
        )
    }
}
impl Add for MusicalTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}
impl Sub for MusicalTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}
impl Mul<usize> for MusicalTime {
    type Output = Self;

    fn mul(self, rhs: usize) -> Self::Output {
        Self(self.0 * rhs)
    }
}
impl Div<usize> for MusicalTime {
    type Output = Self;

    fn div(self, rhs: usize) -> Self::Output {
        Self(self.0 / rhs)
    }
}

/// A [TimeRange] describes a half-open range of [MusicalTime]. Its principal
/// usage is to say which slice of the transport a scheduler should handle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TimeRange(pub Range<MusicalTime>);
impl TimeRange {
    /// Creates a new [TimeRange] with the given absolute start and end.
    pub fn new_with_start_and_end(start: MusicalTime, end: MusicalTime) -> Self {
        Self(start..end)
    }

    /// Creates a new [TimeRange] with the given absolute start and (relative)
    /// duration.
    pub fn new_with_start_and_duration(start: MusicalTime, duration: MusicalTime) -> Self {
        Self(start..(start + duration))
    }

    #[allow(missing_docs)]
    pub fn start(&self) -> MusicalTime {
        self.0.start
    }

    #[allow(missing_docs)]
    pub fn end(&self) -> MusicalTime {
        self.0.end
    }

    #[allow(missing_docs)]
    pub fn duration(&self) -> MusicalTime {
        self.0.end - self.0.start
    }

    #[allow(missing_docs)]
    pub fn contains(&self, item: &MusicalTime) -> bool {
        self.0.contains(item)
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl From<Range<MusicalTime>> for TimeRange {
    fn from(value: Range<MusicalTime>) -> Self {
        Self(value)
    }
}

/// The note-value symbols a pattern uses for durations. The serialized form is
/// the conventional shorthand: `4n` is a quarter note, `8n.` a dotted eighth,
/// `8t` an eighth-note triplet.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumString,
    IntoStaticStr,
    StrumDisplay,
    Serialize,
    Deserialize,
)]
#[allow(missing_docs)]
pub enum NoteValue {
    #[strum(serialize = "1n")]
    #[serde(rename = "1n")]
    Whole,
    #[strum(serialize = "2n")]
    #[serde(rename = "2n")]
    Half,
    #[strum(serialize = "4n")]
    #[serde(rename = "4n")]
    Quarter,
    #[default]
    #[strum(serialize = "8n")]
    #[serde(rename = "8n")]
    Eighth,
    #[strum(serialize = "16n")]
    #[serde(rename = "16n")]
    Sixteenth,
    #[strum(serialize = "32n")]
    #[serde(rename = "32n")]
    ThirtySecond,
    #[strum(serialize = "64n")]
    #[serde(rename = "64n")]
    SixtyFourth,
    #[strum(serialize = "2n.")]
    #[serde(rename = "2n.")]
    DottedHalf,
    #[strum(serialize = "4n.")]
    #[serde(rename = "4n.")]
    DottedQuarter,
    #[strum(serialize = "8n.")]
    #[serde(rename = "8n.")]
    DottedEighth,
    #[strum(serialize = "16n.")]
    #[serde(rename = "16n.")]
    DottedSixteenth,
    #[strum(serialize = "2t")]
    #[serde(rename = "2t")]
    HalfTriplet,
    #[strum(serialize = "4t")]
    #[serde(rename = "4t")]
    QuarterTriplet,
    #[strum(serialize = "8t")]
    #[serde(rename = "8t")]
    EighthTriplet,
    #[strum(serialize = "16t")]
    #[serde(rename = "16t")]
    SixteenthTriplet,
}
impl NoteValue {
    /// The length of this note value.
    pub fn duration(&self) -> MusicalTime {
        let units = MusicalTime::UNITS_IN_BEAT;
        MusicalTime::new_with_units(match self {
            NoteValue::Whole => units * 4,
            NoteValue::Half => units * 2,
            NoteValue::Quarter => units,
            NoteValue::Eighth => units / 2,
            NoteValue::Sixteenth => units / 4,
            NoteValue::ThirtySecond => units / 8,
            NoteValue::SixtyFourth => units / 16,
            NoteValue::DottedHalf => units * 3,
            NoteValue::DottedQuarter => units * 3 / 2,
            NoteValue::DottedEighth => units * 3 / 4,
            NoteValue::DottedSixteenth => units * 3 / 8,
            NoteValue::HalfTriplet => units * 4 / 3,
            NoteValue::QuarterTriplet => units * 2 / 3,
            NoteValue::EighthTriplet => units / 3,
            NoteValue::SixteenthTriplet => units / 6,
        })
    }
}
