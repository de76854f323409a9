//! pipeline.rs
//!
//! One conversion pass, start to end:
//!  1. tempo map from track 0 and the frame clock on top of it
//!  2. channel discovery, configuration merge and one controller per unlocked channel
//!  3. dispatch, track after track, every event to the controller of its channel
//!  4. let every controller close what is still open at the end of the timeline
//!
//! Everything is sequential and the first error aborts the pass.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, trace};

use crate::channel::{Channel, ChannelController, NoteAction};
use crate::config::ConfigStore;
use crate::discovery;
use crate::error::{AnimError, Result};
use crate::midi::{EventKind, MidiDocument};
use crate::scene::Scene;
use crate::tempo::{FrameClock, TempoMap};

/// Knobs of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Options {
    /// Frames per second of the target timeline.
    pub framerate: u32,
    /// Group notes by their MIDI channel instead of by track.
    pub group_by_native_channel: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { framerate: 24, group_by_native_channel: false }
    }
}

/// What a pass hands back besides the scene it filled.
#[derive(Clone, Debug)]
pub struct Outcome {
    /// Last event frame plus one second.
    pub frame_end: f64,
    /// Every channel, locked ones included.
    pub channels: Vec<Channel>,
    pub tempo: TempoMap,
}

/// Timing of the pass, shared by every track.
#[derive(Debug)]
struct Context {
    clock: FrameClock,
    group_by_native_channel: bool,
}

impl Context {
    fn framerate(&self) -> u32 {
        self.clock.framerate()
    }

    fn channel_of(&self, track_index: usize, kind: &EventKind) -> Option<u32> {
        let native = kind.channel()?;
        Some(if self.group_by_native_channel { native as u32 } else { track_index as u32 })
    }
}

/// Channel registry keyed by id. Locked channels have no controller.
struct Registry {
    controllers: BTreeMap<u32, ChannelController>,
    locked: BTreeSet<u32>,
}

impl Registry {
    fn build(channels: &[Channel], framerate: u32, scene: &mut dyn Scene) -> Result<Self> {
        let mut controllers = BTreeMap::new();
        let mut locked = BTreeSet::new();
        for channel in channels {
            if channel.locked {
                info!("channel {} ({}) is locked, skipped", channel.id, channel.display_name);
                locked.insert(channel.id);
                continue;
            }
            info!(
                "channel {} ({}): {} with {} note(s)",
                channel.id,
                channel.display_name,
                channel.visual.tag(),
                channel.notes.len()
            );
            let controller = ChannelController::new(channel.clone(), framerate, scene)?;
            controllers.insert(channel.id, controller);
        }
        Ok(Self { controllers, locked })
    }

    /// `Ok(None)` for locked channels.
    fn get(&mut self, id: u32) -> Result<Option<&mut ChannelController>> {
        if self.locked.contains(&id) {
            return Ok(None);
        }
        match self.controllers.get_mut(&id) {
            Some(ctl) => Ok(Some(ctl)),
            None => Err(AnimError::DataInconsistency(format!("event on unknown channel {id}"))),
        }
    }
}

/// Convert `doc` into entities and keyframes on `scene`.
pub fn animate(
    doc: &MidiDocument,
    options: &Options,
    store: &mut dyn ConfigStore,
    scene: &mut dyn Scene,
) -> Result<Outcome> {
    doc.ensure_supported()?;
    info!("{} track(s), {} event(s), ppq {}", doc.tracks.len(), doc.event_count(), doc.ppq);

    let tempo = TempoMap::new(doc.ppq, &doc.tempo_changes())?;
    debug!("tempo map: {} breakpoint(s) at ppq {}", tempo.breakpoints().len(), tempo.ppq());
    let ctx = Context {
        clock: FrameClock::new(tempo, options.framerate)?,
        group_by_native_channel: options.group_by_native_channel,
    };

    let channels = discovery::merge(discovery::discover(doc, options.group_by_native_channel), store)?;
    let mut registry = Registry::build(&channels, ctx.framerate(), scene)?;

    let mut last_frame: f64 = 0.0;
    for (index, track) in doc.tracks.iter().enumerate() {
        info!("parse track {index} {:?}: {} event(s)", track.name, track.events.len());
        let mut tick: u64 = 0;
        for ev in &track.events {
            tick += ev.delta as u64;
            let Some(id) = ctx.channel_of(index, &ev.kind) else {
                trace!(track = index, tick, "skipping {:?}", ev.kind);
                continue;
            };
            let frame = ctx.clock.frame(tick);
            last_frame = last_frame.max(frame);
            let Some(ctl) = registry.get(id)? else {
                continue;
            };
            dispatch(ctl, &ev.kind, frame, scene)?;
        }
    }

    let frame_end = last_frame + ctx.framerate() as f64;
    for ctl in registry.controllers.values_mut() {
        ctl.finish(frame_end, scene);
    }
    info!("timeline ends at frame {frame_end:.2}");

    Ok(Outcome { frame_end, channels, tempo: ctx.clock.tempo().clone() })
}

fn dispatch(ctl: &mut ChannelController, kind: &EventKind, frame: f64, scene: &mut dyn Scene) -> Result<()> {
    match *kind {
        EventKind::NoteOn { note, velocity: 0, .. } | EventKind::NoteOff { note, .. } => {
            ctl.handle_note_event(NoteAction::Off, frame, note, 0, scene)?
        }
        EventKind::NoteOn { note, velocity, .. } => ctl.handle_note_event(NoteAction::On, frame, note, velocity, scene)?,
        EventKind::PitchWheel { value, .. } => ctl.handle_pitchwheel_event(frame, value, scene),
        EventKind::Aftertouch { value, .. } => ctl.handle_aftertouch_event(frame, value, scene),
        EventKind::ControlChange { controller, value, .. } => {
            ctl.handle_control_change_event(frame, controller, value, scene)
        }
        EventKind::Tempo(_) | EventKind::Other => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelConfig, JsonSidecar, MemoryStore, VisualType};
    use crate::midi::{Format, Track, TrackEvent};
    use crate::scene::Recorder;

    fn ev(delta: u32, kind: EventKind) -> TrackEvent {
        TrackEvent::new(delta, kind)
    }

    fn on(delta: u32, note: u8, velocity: u8) -> TrackEvent {
        ev(delta, EventKind::NoteOn { channel: 0, note, velocity })
    }

    /// Tempo track plus one melody track, ppq 480 at the default tempo.
    fn song(format: Format) -> MidiDocument {
        MidiDocument {
            format,
            ppq: 480,
            tracks: vec![
                Track { name: "Tempo".into(), events: vec![ev(0, EventKind::Other)] },
                Track {
                    name: "Lead".into(),
                    events: vec![
                        on(480, 60, 100),
                        ev(240, EventKind::NoteOff { channel: 0, note: 60, velocity: 40 }),
                        on(240, 62, 64),
                        on(480, 62, 0),
                        ev(0, EventKind::ControlChange { channel: 0, controller: 7, value: 90 }),
                    ],
                },
            ],
        }
    }

    #[test]
    fn bargraph_pass_end_to_end() {
        let mut store = MemoryStore::default();
        let mut rec = Recorder::new();
        let out = animate(&song(Format::Parallel), &Options::default(), &mut store, &mut rec).unwrap();

        // 1440 ticks at 120 bpm is 1.5 s, 36 frames, plus one second
        assert_eq!(out.frame_end, 36.0 + 24.0);
        assert_eq!(out.channels.len(), 2);
        assert_eq!(store.writes, 1);

        // note 60: on at frame 12, off at frame 18, step width 3
        assert_eq!(rec.track("BG_1_60", "scale.z"), vec![(9.0, 1.0), (12.0, 7.25), (15.0, 7.25), (18.0, 1.0)]);
        // velocity 0 note-on closes note 62
        assert_eq!(rec.track("BG_1_62", "location.z"), vec![(21.0, 0.0), (24.0, 4.0), (33.0, 4.0), (36.0, 0.0)]);
        assert_eq!(rec.track("BG_1_template", "volume"), vec![(36.0, 90.0)]);
        // empty tempo track still gets its entities
        assert!(rec.entity("BG_0_Parent").is_some());
    }

    #[test]
    fn format_2_is_rejected_before_any_entity() {
        let mut store = MemoryStore::default();
        let mut rec = Recorder::new();
        let err = animate(&song(Format::Sequential), &Options::default(), &mut store, &mut rec).unwrap_err();
        assert!(matches!(err, AnimError::UnsupportedFormat(_)));
        assert!(rec.entities.is_empty());
        assert_eq!(store.writes, 0);
    }

    #[test]
    fn locked_channels_stay_untouched() {
        let mut lead = ChannelConfig::default_for(1, "Lead");
        lead.locked = true;
        let mut store = MemoryStore::with_entries(vec![ChannelConfig::default_for(0, "Tempo"), lead]);
        let mut rec = Recorder::new();
        let out = animate(&song(Format::Parallel), &Options::default(), &mut store, &mut rec).unwrap();

        assert!(rec.samples.is_empty());
        assert!(rec.entities.iter().all(|e| !e.name.starts_with("BG_1")));
        assert_eq!(store.writes, 0);
        // locked events still count for the end of the timeline
        assert_eq!(out.frame_end, 60.0);
    }

    #[test]
    fn native_channels_route_by_midi_channel() {
        let mut doc = song(Format::SingleTrack);
        doc.tracks.remove(0);
        doc.tracks[0].events.push(ev(0, EventKind::NoteOn { channel: 9, note: 36, velocity: 127 }));

        let mut store = MemoryStore::with_entries(vec![{
            let mut drums = ChannelConfig::default_for(9, "Drums");
            drums.visual_type = VisualType::Light;
            drums
        }]);
        let mut rec = Recorder::new();
        let options = Options { framerate: 24, group_by_native_channel: true };
        let out = animate(&doc, &options, &mut store, &mut rec).unwrap();

        let ids: Vec<u32> = out.channels.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 9]);
        assert_eq!(rec.track("LT_9_Light_36", "energy"), vec![(33.0, 0.0), (36.0, 127_000.0)]);
        assert!(rec.entity("BG_0_60").is_some());
    }

    #[test]
    fn tracks_are_dispatched_one_after_another() {
        // the second track plays earlier in time than the first, same native channel
        let doc = MidiDocument {
            format: Format::Parallel,
            ppq: 480,
            tracks: vec![
                Track { name: "Late".into(), events: vec![on(960, 60, 100)] },
                Track { name: "Early".into(), events: vec![on(480, 60, 50)] },
            ],
        };
        let options = Options { framerate: 24, group_by_native_channel: true };
        let mut rec = Recorder::new();
        let out = animate(&doc, &options, &mut MemoryStore::default(), &mut rec).unwrap();

        assert_eq!(out.channels.len(), 1);
        assert_eq!(out.channels[0].display_name, "Late");
        // track order wins: the early note steps from the velocity the late one left
        assert_eq!(
            rec.track("BG_0_60", "scale.z"),
            vec![(21.0, 1.0), (24.0, 7.25), (9.0, 7.25), (12.0, 4.125)]
        );
        assert_eq!(out.frame_end, 48.0);
    }

    #[test]
    fn controller_on_a_silent_native_channel_is_inconsistent() {
        let mut doc = song(Format::SingleTrack);
        doc.tracks[1].events.push(ev(0, EventKind::PitchWheel { channel: 5, value: 100 }));
        let options = Options { framerate: 24, group_by_native_channel: true };
        let err = animate(&doc, &options, &mut MemoryStore::default(), &mut Recorder::new()).unwrap_err();
        assert!(matches!(err, AnimError::DataInconsistency(_)));
    }

    #[test]
    fn tempo_changes_move_later_events() {
        let mut doc = song(Format::Parallel);
        // 240 bpm from the first beat on
        doc.tracks[0].events = vec![ev(480, EventKind::Tempo(250_000))];
        let mut rec = Recorder::new();
        let out = animate(&doc, &Options::default(), &mut MemoryStore::default(), &mut rec).unwrap();

        assert_eq!(out.tempo.breakpoints().len(), 2);
        // beat one at 12, then 6 frames per beat
        assert_eq!(rec.track("BG_1_60", "scale.z").last(), Some(&(15.0, 1.0)));
        assert_eq!(out.frame_end, 12.0 + 2.0 * 6.0 + 24.0);
    }

    #[test]
    fn zero_framerate_is_a_configuration_error() {
        let options = Options { framerate: 0, ..Options::default() };
        let err = animate(&song(Format::Parallel), &options, &mut MemoryStore::default(), &mut Recorder::new())
            .unwrap_err();
        assert!(matches!(err, AnimError::Configuration(_)));
    }

    #[test]
    fn parses_written_midi_and_persists_sidecar() {
        use midly::num::{u4, u7, u15, u28};
        use midly::{Header, MidiMessage, Smf, Timing, TrackEvent as SmfEvent, TrackEventKind};

        let note = |delta: u32, key: u8, vel: u8| SmfEvent {
            delta: u28::from(delta),
            kind: TrackEventKind::Midi {
                channel: u4::from(0u8),
                message: MidiMessage::NoteOn { key: u7::from(key), vel: u7::from(vel) },
            },
        };
        let end = SmfEvent { delta: u28::from(0u32), kind: TrackEventKind::Meta(midly::MetaMessage::EndOfTrack) };
        let smf = Smf {
            header: Header::new(midly::Format::SingleTrack, Timing::Metrical(u15::from(480u16))),
            tracks: vec![vec![note(0, 67, 80), note(960, 67, 0), end]],
        };

        let dir = tempfile::tempdir().unwrap();
        let midi_path = dir.path().join("tune.mid");
        let mut file = std::fs::File::create(&midi_path).unwrap();
        smf.write_std(&mut file).unwrap();
        drop(file);

        let doc = MidiDocument::open(&midi_path).unwrap();
        let mut sidecar = JsonSidecar::beside(&midi_path);
        let mut rec = Recorder::new();
        let out = animate(&doc, &Options::default(), &mut sidecar, &mut rec).unwrap();

        assert_eq!(out.frame_end, 48.0);
        assert!(sidecar.path().exists());
        assert_eq!(rec.track("BG_0_67", "location.z"), vec![(0.0, 0.0), (0.0, 5.0), (21.0, 5.0), (24.0, 0.0)]);
    }
}
