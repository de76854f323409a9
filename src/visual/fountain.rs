use std::collections::BTreeMap;

use super::{NoteEvent, NoteHandles, PropertyChange, SPACING, Stage, Visualization};
use super::{create_group, entity_name, model_location, note_place};
use crate::channel::Channel;
use crate::scene::{EntityKind, EntityRef, EntityRequest, Shape};

/// Particle lifetime, in seconds.
const LIFETIME_SECS: f64 = 20.0;

#[derive(Debug, Clone)]
struct OpenBurst {
    emitter: EntityRef,
    start: f64,
    velocity: u8,
}

/// One emitter per note. A note-on opens a particle burst that runs until the note is
/// released; the burst is handed to the scene once both ends are known.
#[derive(Debug, Default, Clone)]
pub struct Fountain {
    open: BTreeMap<u8, OpenBurst>,
    bursts: u32,
}

impl Fountain {
    fn close(&mut self, note: u8, frame: f64, stage: &mut Stage<'_>) {
        let Some(burst) = self.open.remove(&note) else {
            return;
        };
        self.bursts += 1;
        let lifetime = stage.framerate() * LIFETIME_SECS;
        stage.create(
            EntityRequest::new(
                format!("{}_PS_{}", burst.emitter, self.bursts),
                EntityKind::Burst {
                    emitter: burst.emitter.clone(),
                    frame_start: burst.start,
                    frame_end: frame.max(burst.start),
                    count: burst.velocity as u32 * 2,
                    lifetime,
                    aim: [0.0, 0.0, (burst.velocity / 8) as f64],
                },
            )
            .parent(&burst.emitter),
        );
    }
}

impl Visualization for Fountain {
    fn setup(&mut self, channel: &Channel, stage: &mut Stage<'_>) -> NoteHandles {
        let group = create_group(channel, stage);
        let particle = stage.create(
            EntityRequest::new(
                entity_name(channel, "particle"),
                EntityKind::Model { shape: Shape::UvSphere, source: None },
            )
            .parent(&group)
            .at(0.0, 0.0, -20.0),
        );
        let [x, y, z] = model_location(channel);
        let model = stage.create(
            EntityRequest::new(
                entity_name(channel, "template"),
                EntityKind::Model { shape: Shape::IcoSphere, source: channel.template.clone() },
            )
            .parent(&group)
            .at(x, y, z),
        );

        let mut handles = NoteHandles::new(particle);
        for &note in &channel.notes {
            let emitter = stage.create(
                EntityRequest::new(entity_name(channel, note), EntityKind::Instance { model: model.clone() })
                    .parent(&group)
                    .at(note_place(channel, note) * SPACING, 0.0, 0.0),
            );
            handles.notes.insert(note, emitter);
        }
        handles
    }

    fn map_event(&mut self, handle: &EntityRef, event: &NoteEvent, stage: &mut Stage<'_>) -> Vec<PropertyChange> {
        // a retrigger without release ends the running burst first
        self.close(event.note, event.frame, stage);
        if event.is_on() {
            self.open.insert(
                event.note,
                OpenBurst { emitter: handle.clone(), start: event.frame, velocity: event.velocity },
            );
        }
        Vec::new()
    }

    fn finish(&mut self, frame_end: f64, stage: &mut Stage<'_>) {
        let notes: Vec<u8> = self.open.keys().copied().collect();
        for note in notes {
            self.close(note, frame_end, stage);
        }
    }
}
