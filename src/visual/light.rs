use super::{NoteEvent, NoteHandles, PropertyChange, SPACING, Stage, Visualization};
use super::{create_group, entity_name, note_place};
use crate::channel::Channel;
use crate::scene::{EntityKind, EntityRef, EntityRequest};

/// One point light per note, hanging 4 units up.
#[derive(Debug, Default, Clone, Copy)]
pub struct Light;

fn energy(velocity: u8) -> f64 {
    velocity as f64 * 1000.0
}

impl Visualization for Light {
    fn setup(&mut self, channel: &Channel, stage: &mut Stage<'_>) -> NoteHandles {
        let group = create_group(channel, stage);
        let mut handles = NoteHandles::new(group.clone());
        for &note in &channel.notes {
            let light = stage.create(
                EntityRequest::new(entity_name(channel, format!("Light_{note}")), EntityKind::PointLight)
                    .parent(&group)
                    .at(note_place(channel, note) * SPACING * 3.0, 0.0, 4.0),
            );
            handles.notes.insert(note, light);
        }
        handles
    }

    fn map_event(&mut self, handle: &EntityRef, event: &NoteEvent, _stage: &mut Stage<'_>) -> Vec<PropertyChange> {
        vec![PropertyChange::new(handle, "energy", energy(event.previous), energy(event.velocity))]
    }
}
