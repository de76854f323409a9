use super::{NoteEvent, NoteHandles, PropertyChange, SPACING, Stage, Visualization};
use super::{create_group, entity_name, model_location, note_place};
use crate::channel::Channel;
use crate::scene::{EntityKind, EntityRef, EntityRequest, Shape};

/// One bar per note, growing along z with the velocity.
#[derive(Debug, Default, Clone, Copy)]
pub struct Bargraph;

fn height(velocity: u8) -> f64 {
    velocity as f64 / 16.0
}

impl Visualization for Bargraph {
    fn setup(&mut self, channel: &Channel, stage: &mut Stage<'_>) -> NoteHandles {
        let group = create_group(channel, stage);
        let [x, y, z] = model_location(channel);
        let model = stage.create(
            EntityRequest::new(
                entity_name(channel, "template"),
                EntityKind::Model { shape: Shape::Cube, source: channel.template.clone() },
            )
            .parent(&group)
            .at(x, y, z),
        );

        let mut handles = NoteHandles::new(model.clone());
        for &note in &channel.notes {
            let bar = stage.create(
                EntityRequest::new(entity_name(channel, note), EntityKind::Instance { model: model.clone() })
                    .parent(&group)
                    .at(note_place(channel, note) * SPACING, 0.0, 0.0),
            );
            handles.notes.insert(note, bar);
        }
        handles
    }

    fn map_event(&mut self, handle: &EntityRef, event: &NoteEvent, _stage: &mut Stage<'_>) -> Vec<PropertyChange> {
        let (before, after) = (height(event.previous), height(event.velocity));
        vec![
            PropertyChange::new(handle, "scale.z", before + 1.0, after + 1.0),
            // half of the extra scale lifts the base back onto the floor
            PropertyChange::new(handle, "location.z", before, after),
        ]
    }
}
