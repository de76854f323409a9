use super::{NoteEvent, NoteHandles, PropertyChange, Stage, Visualization};
use super::{base_name, create_group, entity_name};
use crate::channel::Channel;
use crate::pitch::Pitch;
use crate::scene::{EntityKind, EntityRef, EntityRequest, Shape};

/// Frames a ball flies from the gun to the wall.
const FLIGHT_FRAMES: f64 = 50.0;
const WALL_Y: f64 = 40.0;

/// A gun shooting one fresh ball per note-on at a wall. The impact point encodes the
/// note: x from the pitch class, z from the octave. Balls are never reused.
#[derive(Debug, Default, Clone)]
pub struct SplashWall {
    group: Option<EntityRef>,
    balls: u32,
}

impl Visualization for SplashWall {
    fn setup(&mut self, channel: &Channel, stage: &mut Stage<'_>) -> NoteHandles {
        let group = create_group(channel, stage);
        stage.create(
            EntityRequest::new(entity_name(channel, "wall"), EntityKind::Collider { kill: false })
                .parent(&group)
                .at(0.0, WALL_Y, 0.0),
        );
        stage.create(
            EntityRequest::new(entity_name(channel, "killer_plane"), EntityKind::Collider { kill: true })
                .parent(&group)
                .at(0.0, WALL_Y + 1.0, 0.0),
        );
        let gun = stage.create(
            EntityRequest::new(
                base_name(channel),
                EntityKind::Model { shape: Shape::Cylinder, source: channel.template.clone() },
            )
            .parent(&group),
        );
        self.group = Some(group);
        NoteHandles::shared(channel, gun.clone(), &gun)
    }

    fn map_event(&mut self, handle: &EntityRef, event: &NoteEvent, stage: &mut Stage<'_>) -> Vec<PropertyChange> {
        if !event.is_on() {
            return Vec::new();
        }
        self.balls += 1;
        let pitch = Pitch::of(event.note);
        let mut request = EntityRequest::new(
            format!("{handle}_ball_{}", self.balls),
            EntityKind::Projectile { pitch_class: pitch.class, octave: pitch.octave },
        );
        request.parent = self.group.clone();
        let ball = stage.create(request);

        let frame = event.frame;
        let x = 12.0 - pitch.class as f64 * 2.0;
        let z = 12.0 - pitch.octave as f64 * 2.0;
        let after = frame + stage.framerate();
        // notes near the start fly a shorter path, launch and impact never share a frame
        let launch = (frame - FLIGHT_FRAMES).max(0.0);
        let mut path = Vec::with_capacity(3);
        if launch < frame {
            path.push((launch, [0.0, 0.0, 0.0]));
        }
        path.push((frame, [x, WALL_Y, z]));
        path.push((after, [x, WALL_Y + 5.0, z]));
        for (f, [bx, by, bz]) in path {
            stage.key(&ball, "location.x", f, bx);
            stage.key(&ball, "location.y", f, by);
            stage.key(&ball, "location.z", f, bz);
        }
        // flattened on impact
        let squash = (frame - 3.0).max(0.0);
        if squash < frame {
            stage.key(&ball, "deform.factor", squash, 0.0);
        }
        stage.key(&ball, "deform.factor", frame, -1.0);

        let lifetime = stage.framerate() * 20.0;
        stage.create(
            EntityRequest::new(
                format!("{ball}_splash"),
                EntityKind::Burst {
                    emitter: ball.clone(),
                    frame_start: (frame - 5.0).max(0.0),
                    frame_end: frame + 5.0,
                    count: 500,
                    lifetime,
                    aim: [0.0; 3],
                },
            )
            .parent(&ball),
        );
        Vec::new()
    }
}
