//! channel.rs
//!
//! A channel is a group of notes sharing one visual. Its controller is an event reducer:
//! it remembers the last velocity of every note plus the channel-wide controller values,
//! and turns each incoming event into keyframes through the channel's strategy.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::config::VisualType;
use crate::error::{AnimError, Result};
use crate::keyframe;
use crate::scene::{AnimationSample, Scene};
use crate::visual::{self, NoteEvent, NoteHandles, Stage, Visualization};

/// A discovered channel merged with its configuration. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Channel {
    /// Track index, or MIDI channel number when grouping by native channel.
    pub id: u32,
    pub display_name: String,
    pub visual: VisualType,
    /// Existing scene object to use as model instead of the built-in shape.
    pub template: Option<String>,
    pub locked: bool,
    pub animate: bool,
    /// Distinct note numbers played on this channel.
    pub notes: BTreeSet<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteAction {
    On,
    Off,
}

/// Controllers we animate, by MIDI controller number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Modulation,
    Volume,
    Pan,
    Expression,
    Sustain,
}

impl Control {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Control::Modulation),
            7 => Some(Control::Volume),
            10 => Some(Control::Pan),
            11 => Some(Control::Expression),
            64 => Some(Control::Sustain),
            _ => None,
        }
    }

    pub fn property(self) -> &'static str {
        match self {
            Control::Modulation => "modulation",
            Control::Volume => "volume",
            Control::Pan => "pan",
            Control::Expression => "expression",
            Control::Sustain => "sustain",
        }
    }
}

/// Channel-wide values, all 0 until the first event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScalarState {
    pub pitchwheel: i16,
    pub aftertouch: u8,
    pub modulation: u8,
    pub volume: u8,
    pub pan: u8,
    pub expression: u8,
    pub sustain: u8,
}

impl ScalarState {
    fn slot(&mut self, control: Control) -> &mut u8 {
        match control {
            Control::Modulation => &mut self.modulation,
            Control::Volume => &mut self.volume,
            Control::Pan => &mut self.pan,
            Control::Expression => &mut self.expression,
            Control::Sustain => &mut self.sustain,
        }
    }
}

pub struct ChannelController {
    channel: Channel,
    strategy: Box<dyn Visualization>,
    handles: NoteHandles,
    velocities: BTreeMap<u8, u8>,
    scalars: ScalarState,
    framerate: u32,
    step_width: u32,
}

impl std::fmt::Debug for ChannelController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelController")
            .field("channel", &self.channel)
            .field("handles", &self.handles)
            .field("velocities", &self.velocities)
            .field("scalars", &self.scalars)
            .field("step_width", &self.step_width)
            .finish_non_exhaustive()
    }
}

impl ChannelController {
    /// Build the controller with the strategy of the channel's visual type and run its
    /// setup. Creates entities, emits no samples.
    pub fn new(channel: Channel, framerate: u32, scene: &mut dyn Scene) -> Result<Self> {
        let strategy = visual::strategy_for(channel.visual);
        Self::with_strategy(channel, strategy, framerate, scene)
    }

    pub fn with_strategy(
        channel: Channel,
        mut strategy: Box<dyn Visualization>,
        framerate: u32,
        scene: &mut dyn Scene,
    ) -> Result<Self> {
        let handles = strategy.setup(&channel, &mut Stage::new(scene, framerate));
        if let Some(missing) = channel.notes.iter().find(|n| !handles.notes.contains_key(n)) {
            return Err(AnimError::DataInconsistency(format!(
                "channel {} setup produced no entity for note {missing}",
                channel.id
            )));
        }
        let velocities = channel.notes.iter().map(|&n| (n, 0)).collect();
        Ok(Self {
            channel,
            strategy,
            handles,
            velocities,
            scalars: ScalarState::default(),
            framerate,
            step_width: keyframe::step_width(framerate),
        })
    }

    /// Last recorded velocity of `note`, `None` if the channel never plays it.
    pub fn velocity(&self, note: u8) -> Option<u8> {
        self.velocities.get(&note).copied()
    }

    pub fn scalars(&self) -> &ScalarState {
        &self.scalars
    }

    pub fn step_width(&self) -> u32 {
        self.step_width
    }

    pub fn handle_note_event(
        &mut self,
        action: NoteAction,
        frame: f64,
        note: u8,
        velocity: u8,
        scene: &mut dyn Scene,
    ) -> Result<()> {
        let Some(&previous) = self.velocities.get(&note) else {
            return Err(AnimError::DataInconsistency(format!(
                "note {note} is not part of channel {} ({})",
                self.channel.id, self.channel.display_name
            )));
        };
        if self.channel.locked || !self.channel.animate {
            return Ok(());
        }
        let velocity = match action {
            NoteAction::On => velocity,
            NoteAction::Off => 0,
        };
        let Some(handle) = self.handles.get(note).cloned() else {
            return Err(AnimError::DataInconsistency(format!(
                "no entity for note {note} on channel {}",
                self.channel.id
            )));
        };

        let event = NoteEvent { frame, note, previous, velocity };
        let mut stage = Stage::new(scene, self.framerate);
        let changes = self.strategy.map_event(&handle, &event, &mut stage);
        for change in changes {
            keyframe::emit(
                scene,
                &change.entity,
                change.property,
                frame,
                change.value,
                change.previous,
                self.step_width,
            );
        }
        self.velocities.insert(note, velocity);
        Ok(())
    }

    pub fn handle_pitchwheel_event(&mut self, frame: f64, value: i16, scene: &mut dyn Scene) {
        self.scalars.pitchwheel = value;
        self.key(scene, "pitchwheel", frame, value as f64);
    }

    pub fn handle_aftertouch_event(&mut self, frame: f64, value: u8, scene: &mut dyn Scene) {
        self.scalars.aftertouch = value;
        self.key(scene, "aftertouch", frame, value as f64);
    }

    /// Unknown controller numbers are ignored.
    pub fn handle_control_change_event(&mut self, frame: f64, controller: u8, value: u8, scene: &mut dyn Scene) {
        let Some(control) = Control::from_id(controller) else {
            trace!(channel = self.channel.id, controller, "ignoring controller");
            return;
        };
        *self.scalars.slot(control) = value;
        self.key(scene, control.property(), frame, value as f64);
    }

    /// End of the pass: let the strategy close whatever is still running.
    pub fn finish(&mut self, frame_end: f64, scene: &mut dyn Scene) {
        self.strategy.finish(frame_end, &mut Stage::new(scene, self.framerate));
    }

    fn key(&self, scene: &mut dyn Scene, property: &str, frame: f64, value: f64) {
        scene.key(AnimationSample::new(&self.handles.channel, property, frame, value));
    }
}
