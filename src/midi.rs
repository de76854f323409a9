//! midi.rs
//!
//! This module turns a Standard MIDI File (SMF) into the track/event model the rest of
//! the crate works on. Unlike a player, we do *not* flatten tracks into one chronological
//! list: every track keeps its own events with their original delta ticks, because the
//! converter dispatches track after track and channel discovery may group by track.
//!
//! ### Quick primer on MIDI
//! - A MIDI file holds one or more tracks, each a list of events separated by "delta ticks".
//! - Timing is expressed in ticks. The header's pulses-per-quarter-note (PPQ) plus tempo
//!   meta events (microseconds per quarter note) turn ticks into seconds.
//! - Format 0 has a single track, format 1 has parallel tracks sharing the tempo of track 0,
//!   format 2 has independent sequences each with its own tempo. We only accept 0 and 1.
//!
//! This module takes care of:
//!  - Rejecting format 2 files and SMPTE-timed files
//!  - Picking up the track names
//!  - Normalizing the MIDI messages we animate into `EventKind`
//!  - Keeping everything else as `EventKind::Other` so delta ticks still add up

use std::path::Path;

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use tracing::debug;

use crate::error::{AnimError, Result};

/// SMF container layout, mirrored from the header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// Format 0: a single multi-channel track.
    SingleTrack,
    /// Format 1: simultaneous tracks, tempo lives in track 0.
    Parallel,
    /// Format 2: independent sequences, each with its own tempo.
    Sequential,
}

/// The subset of MIDI messages the converter reacts to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EventKind {
    /// Note on. Velocity 0 is kept as is and treated as a note off at dispatch.
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    /// Pitch wheel, centered: -8192..=8191.
    PitchWheel { channel: u8, value: i16 },
    /// Channel pressure.
    Aftertouch { channel: u8, value: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// Tempo meta event in microseconds per quarter note.
    Tempo(u32),
    /// Anything else (program change, poly pressure, sysex, other meta events).
    Other,
}

impl EventKind {
    /// MIDI channel of a channel message, `None` for meta and ignored events.
    pub fn channel(&self) -> Option<u8> {
        match *self {
            EventKind::NoteOn { channel, .. }
            | EventKind::NoteOff { channel, .. }
            | EventKind::PitchWheel { channel, .. }
            | EventKind::Aftertouch { channel, .. }
            | EventKind::ControlChange { channel, .. } => Some(channel),
            EventKind::Tempo(_) | EventKind::Other => None,
        }
    }
}

/// One event with its delta time relative to the previous event of the same track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackEvent {
    pub delta: u32,
    pub kind: EventKind,
}

impl TrackEvent {
    pub fn new(delta: u32, kind: EventKind) -> Self {
        Self { delta, kind }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Track {
    /// From the first TrackName meta event, empty if there is none.
    pub name: String,
    pub events: Vec<TrackEvent>,
}

/// A decoded MIDI file, ready for conversion.
#[derive(Clone, Debug, PartialEq)]
pub struct MidiDocument {
    pub format: Format,
    /// Pulses per quarter note (from header)
    pub ppq: u32,
    pub tracks: Vec<Track>,
}

impl MidiDocument {
    /// Read and decode a `.mid` file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| AnimError::io(path, e))?;
        Self::parse(&bytes)
    }

    /// Decode SMF bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let smf = Smf::parse(bytes)?;
        Self::from_smf(&smf)
    }

    /// Convert an already parsed `midly` file.
    ///
    /// Fails with `UnsupportedFormat` for format 2 and for SMPTE timecode timing, since
    /// neither can be expressed with one tempo map in ticks.
    pub fn from_smf(smf: &Smf<'_>) -> Result<Self> {
        let format = match smf.header.format {
            midly::Format::SingleTrack => Format::SingleTrack,
            midly::Format::Parallel => Format::Parallel,
            midly::Format::Sequential => {
                return Err(AnimError::UnsupportedFormat(
                    "format 2 (independent per-track tempo) is not supported".into(),
                ));
            }
        };
        let ppq = match smf.header.timing {
            Timing::Metrical(t) => t.as_int() as u32,
            Timing::Timecode(fps, sub) => {
                return Err(AnimError::UnsupportedFormat(format!(
                    "SMPTE timing ({} fps, {sub} ticks per frame) is not supported",
                    fps.as_int()
                )));
            }
        };

        let tracks = smf.tracks.iter().map(|tr| convert_track(tr)).collect();
        Ok(Self { format, ppq, tracks })
    }

    /// Refuse documents the converter cannot handle. `from_smf` already does this, but
    /// hosts may build documents by hand.
    pub fn ensure_supported(&self) -> Result<()> {
        if self.format == Format::Sequential {
            return Err(AnimError::UnsupportedFormat(
                "format 2 (independent per-track tempo) is not supported".into(),
            ));
        }
        Ok(())
    }

    /// Tempo changes of the tempo track (track 0) as
    /// `(ticks since the previous tempo event, microseconds per quarter)`.
    pub fn tempo_changes(&self) -> Vec<(u32, u32)> {
        let Some(track) = self.tracks.first() else {
            return Vec::new();
        };
        let mut changes = Vec::new();
        let mut pending: u32 = 0;
        for ev in &track.events {
            pending = pending.saturating_add(ev.delta);
            if let EventKind::Tempo(us) = ev.kind {
                changes.push((pending, us));
                pending = 0;
            }
        }
        changes
    }

    /// Number of events over all tracks, for logging.
    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(|t| t.events.len()).sum()
    }
}

fn convert_track(track: &[midly::TrackEvent<'_>]) -> Track {
    let mut name: Option<String> = None;
    let mut events = Vec::with_capacity(track.len());

    for ev in track {
        let kind = match ev.kind {
            TrackEventKind::Meta(MetaMessage::Tempo(tp)) => EventKind::Tempo(tp.as_int()),
            TrackEventKind::Meta(MetaMessage::TrackName(raw)) => {
                if name.is_none() {
                    name = Some(String::from_utf8_lossy(raw).into_owned());
                }
                EventKind::Other
            }
            TrackEventKind::Midi { channel, message } => convert_message(channel.as_int(), message),
            _ => EventKind::Other,
        };
        events.push(TrackEvent { delta: ev.delta.as_int(), kind });
    }

    Track { name: name.unwrap_or_default(), events }
}

fn convert_message(channel: u8, message: MidiMessage) -> EventKind {
    match message {
        MidiMessage::NoteOn { key, vel } => EventKind::NoteOn {
            channel,
            note: key.as_int(),
            velocity: vel.as_int(),
        },
        MidiMessage::NoteOff { key, vel } => EventKind::NoteOff {
            channel,
            note: key.as_int(),
            velocity: vel.as_int(),
        },
        MidiMessage::Controller { controller, value } => EventKind::ControlChange {
            channel,
            controller: controller.as_int(),
            value: value.as_int(),
        },
        MidiMessage::PitchBend { bend } => {
            // 14-bit raw value, 0x2000 is the wheel at rest
            let raw = bend.0.as_int() as i16;
            EventKind::PitchWheel { channel, value: raw - 0x2000 }
        }
        MidiMessage::ChannelAftertouch { vel } => EventKind::Aftertouch {
            channel,
            value: vel.as_int(),
        },
        other => {
            debug!(channel, ?other, "ignoring MIDI message");
            EventKind::Other
        }
    }
}
