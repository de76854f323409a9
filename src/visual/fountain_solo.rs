use std::collections::BTreeMap;
use std::f64::consts::TAU;

use super::{NoteEvent, NoteHandles, PropertyChange, Stage, Visualization};
use super::{base_name, create_group, entity_name, model_location};
use crate::channel::Channel;
use crate::pitch::Pitch;
use crate::scene::{EntityKind, EntityRef, EntityRequest, Shape};

/// Upward push per octave so the particle lands on its target, found by trial.
const Z_COEF: [f64; 11] = [7.8, 6.3, 5.5, 5.0, 4.7, 4.45, 4.3, 4.2, 4.1, 4.0, 3.8];
/// Frames between launch and landing.
const FLIGHT_FRAMES: f64 = 39.0;
const LIFETIME_SECS: f64 = 4.0;

/// Angle of a pitch class on the circle, one twelfth of a turn per semitone.
fn angle(pitch: Pitch) -> f64 {
    (12 - pitch.class) as f64 * (TAU / 12.0)
}

/// Scale of a target along its length: shorter while the note sounds.
fn target_scale(pitch: Pitch, velocity: u8) -> f64 {
    let base = if velocity != 0 { 0.2 } else { 0.4 };
    base + pitch.octave as f64 / 6.0
}

/// Initial direction of the particle shot at `note`.
pub fn aim(note: u8) -> [f64; 3] {
    let pitch = Pitch::of(note);
    let a = angle(pitch);
    let distance = pitch.octave as f64 + 2.0;
    [distance * a.cos(), distance * a.sin(), Z_COEF[pitch.octave as usize]]
}

/// A single emitter in the middle of a spiral of targets (one per pitch class and
/// octave). Every note-on shoots one particle at the note's target, which dips.
#[derive(Debug, Default, Clone)]
pub struct FountainSolo {
    targets: BTreeMap<u8, EntityRef>,
    shots: u32,
}

impl Visualization for FountainSolo {
    fn setup(&mut self, channel: &Channel, stage: &mut Stage<'_>) -> NoteHandles {
        let group = create_group(channel, stage);
        let [x, y, z] = model_location(channel);
        stage.create(
            EntityRequest::new(entity_name(channel, "particle"), EntityKind::Model { shape: Shape::UvSphere, source: None })
                .parent(&group)
                .at(x, 0.0, -20.0),
        );
        let model = stage.create(
            EntityRequest::new(
                entity_name(channel, "template"),
                EntityKind::Model { shape: Shape::Cylinder, source: channel.template.clone() },
            )
            .parent(&group)
            .at(x, y, z),
        );
        let emitter = stage.create(
            EntityRequest::new(base_name(channel), EntityKind::Instance { model: model.clone() })
                .parent(&group)
                .at(0.0, 0.0, 4.0),
        );

        for &note in &channel.notes {
            let pitch = Pitch::of(note);
            let a = angle(pitch);
            let distance = pitch.octave as f64 * 1.25 + 4.0;
            let target = stage.create(
                EntityRequest::new(
                    entity_name(channel, format!("Target_{}_{}", pitch.octave, pitch.class)),
                    EntityKind::Target {
                        pitch_class: pitch.class,
                        octave: pitch.octave,
                        sharp: pitch.is_sharp(),
                        rotation: a,
                    },
                )
                .parent(&group)
                .at(distance * a.cos(), distance * a.sin(), 0.0),
            );
            self.targets.insert(note, target);
        }

        NoteHandles::shared(channel, model, &emitter)
    }

    fn map_event(&mut self, handle: &EntityRef, event: &NoteEvent, stage: &mut Stage<'_>) -> Vec<PropertyChange> {
        let pitch = Pitch::of(event.note);
        let mut changes = Vec::new();
        if let Some(target) = self.targets.get(&event.note) {
            changes.push(PropertyChange::new(
                target,
                "scale.y",
                target_scale(pitch, event.previous),
                target_scale(pitch, event.velocity),
            ));
        }

        if event.is_on() {
            self.shots += 1;
            let start = (event.frame - FLIGHT_FRAMES).max(0.0);
            let lifetime = stage.framerate() * LIFETIME_SECS;
            stage.create(
                EntityRequest::new(
                    format!("{handle}_PS_{}", self.shots),
                    EntityKind::Burst {
                        emitter: handle.clone(),
                        frame_start: start,
                        frame_end: start + lifetime,
                        count: 1,
                        lifetime,
                        aim: aim(event.note),
                    },
                )
                .parent(handle),
            );
        }
        changes
    }
}
