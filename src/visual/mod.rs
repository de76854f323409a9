//! visual
//!
//! Visualization strategies: how a channel looks and how a note event changes it.
//!
//! Every strategy does two things:
//!  - `setup` asks the scene for the channel's entities and returns the note → entity
//!    handles the controller will use (one entity per note, or one shared by all notes)
//!  - `map_event` turns one note event into property changes `(previous, new)` that the
//!    controller feeds to the keyframe emitter
//!
//! Strategies that spawn things (particle bursts, splash balls) do it through the
//! `Stage` passed to them. The controller never knows which strategy it drives.

mod bargraph;
mod fountain;
mod fountain_solo;
mod grid;
mod light;
mod paper_ball;
mod splash_wall;
mod texture_paint;

use std::collections::BTreeMap;

pub use bargraph::Bargraph;
pub use fountain::Fountain;
pub use fountain_solo::FountainSolo;
pub use grid::Grid;
pub use light::Light;
pub use paper_ball::PaperBall;
pub use splash_wall::SplashWall;
pub use texture_paint::TexturePaint;

use crate::channel::Channel;
use crate::config::VisualType;
use crate::scene::{AnimationSample, EntityKind, EntityRef, EntityRequest, Scene};

/// Distance between two neighbouring note places.
pub const SPACING: f64 = 2.5;

/// Entities a channel's events are applied to.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteHandles {
    /// Receives the channel-wide properties (pitch wheel, controllers).
    pub channel: EntityRef,
    pub notes: BTreeMap<u8, EntityRef>,
}

impl NoteHandles {
    pub fn new(channel: EntityRef) -> Self {
        Self { channel, notes: BTreeMap::new() }
    }

    /// Every note of `channel` mapped to the same entity.
    pub fn shared(channel: &Channel, channel_entity: EntityRef, shared: &EntityRef) -> Self {
        let notes = channel.notes.iter().map(|&n| (n, shared.clone())).collect();
        Self { channel: channel_entity, notes }
    }

    pub fn get(&self, note: u8) -> Option<&EntityRef> {
        self.notes.get(&note)
    }
}

/// A note event as seen by a strategy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteEvent {
    pub frame: f64,
    pub note: u8,
    /// Velocity recorded for this note before the event.
    pub previous: u8,
    /// 0 for note off.
    pub velocity: u8,
}

impl NoteEvent {
    pub fn is_on(&self) -> bool {
        self.velocity != 0
    }
}

/// One property going from `previous` to `value`.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyChange {
    pub entity: EntityRef,
    pub property: &'static str,
    pub previous: f64,
    pub value: f64,
}

impl PropertyChange {
    pub fn new(entity: &EntityRef, property: &'static str, previous: f64, value: f64) -> Self {
        Self { entity: entity.clone(), property, previous, value }
    }
}

/// What a strategy may touch: the scene, and the frame rate of the pass.
pub struct Stage<'a> {
    scene: &'a mut dyn Scene,
    framerate: u32,
}

impl<'a> Stage<'a> {
    pub fn new(scene: &'a mut dyn Scene, framerate: u32) -> Self {
        Self { scene, framerate }
    }

    pub fn framerate(&self) -> f64 {
        self.framerate as f64
    }

    pub fn create(&mut self, request: EntityRequest) -> EntityRef {
        self.scene.create(request)
    }

    /// Direct key, no step.
    pub fn key(&mut self, entity: &EntityRef, property: &str, frame: f64, value: f64) {
        self.scene.key(AnimationSample::new(entity, property, frame, value));
    }
}

pub trait Visualization {
    /// Create the channel's entities. Must return a handle for every note of the channel.
    fn setup(&mut self, channel: &Channel, stage: &mut Stage<'_>) -> NoteHandles;

    /// Map a note event on `handle` to property changes.
    fn map_event(&mut self, handle: &EntityRef, event: &NoteEvent, stage: &mut Stage<'_>) -> Vec<PropertyChange>;

    /// Called once after the last track, with the end frame of the timeline.
    fn finish(&mut self, _frame_end: f64, _stage: &mut Stage<'_>) {}
}

/// The strategy implementing a visual type.
pub fn strategy_for(visual: VisualType) -> Box<dyn Visualization> {
    match visual {
        VisualType::Bargraph => Box::new(Bargraph),
        VisualType::Grid => Box::<Grid>::default(),
        VisualType::Light => Box::new(Light),
        VisualType::Fountain => Box::<Fountain>::default(),
        VisualType::FountainSolo => Box::<FountainSolo>::default(),
        VisualType::SplashWall => Box::<SplashWall>::default(),
        VisualType::PaperBall => Box::new(PaperBall),
        VisualType::TexturePaint => Box::new(TexturePaint),
    }
}

/// `"{tag}_{id}"`, the prefix of every entity name of a channel.
pub(crate) fn base_name(channel: &Channel) -> String {
    format!("{}_{}", channel.visual.tag(), channel.id)
}

pub(crate) fn entity_name(channel: &Channel, suffix: impl std::fmt::Display) -> String {
    format!("{}_{suffix}", base_name(channel))
}

/// Channel parent, one row per channel along y.
pub(crate) fn create_group(channel: &Channel, stage: &mut Stage<'_>) -> EntityRef {
    stage.create(
        EntityRequest::new(entity_name(channel, "Parent"), EntityKind::Group)
            .at(0.0, channel.id as f64 * SPACING, 0.0),
    )
}

/// Where shared models are parked, out of the way of the note rows.
pub(crate) fn model_location(channel: &Channel) -> [f64; 3] {
    [-50.0 * SPACING, channel.id as f64 * SPACING, 0.0]
}

/// Place of `note` in the channel's note range, centred on the middle of the range.
/// Unused notes in between keep their place, so the layout reads like a keyboard.
pub(crate) fn note_place(channel: &Channel, note: u8) -> f64 {
    let (Some(&min), Some(&max)) = (channel.notes.first(), channel.notes.last()) else {
        return 0.0;
    };
    let count = (max - min) as i32 + 1;
    let median = count / 2;
    ((note as i32 - min as i32) - median) as f64
}


#[cfg(test)]
mod tests {
    use super::testing::channel;
    use super::*;
    use crate::scene::Recorder;

    #[test]
    fn places_are_centred_on_the_note_range() {
        let ch = channel(VisualType::Bargraph, 0, &[60, 62, 64]);
        assert_eq!(note_place(&ch, 60), -2.0);
        assert_eq!(note_place(&ch, 62), 0.0);
        assert_eq!(note_place(&ch, 64), 2.0);
    }

    #[test]
    fn every_strategy_hands_out_a_handle_per_note() {
        for visual in VisualType::ALL {
            let ch = channel(visual, 3, &[36, 48, 61]);
            let mut rec = Recorder::new();
            let mut stage = Stage::new(&mut rec, 24);
            let handles = strategy_for(visual).setup(&ch, &mut stage);
            let notes: Vec<u8> = handles.notes.keys().copied().collect();
            assert_eq!(notes, vec![36, 48, 61], "{visual:?}");
            assert!(rec.samples.is_empty(), "{visual:?} keyed during setup");
            for handle in handles.notes.values().chain([&handles.channel]) {
                assert!(rec.entity(handle.name()).is_some(), "{visual:?}: {handle} not created");
            }
        }
    }
}
