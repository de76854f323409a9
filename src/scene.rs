//! scene.rs
//!
//! The boundary to whatever actually builds the 3D scene. The converter never touches
//! geometry: it *asks* for entities (by name and kind) and emits keyframe samples on
//! them. A host wires `Scene` to its renderer; `Recorder` keeps everything in memory and
//! is what the command line tool serializes to JSON.

use serde::Serialize;

/// Handle of an entity created by the scene. Entity names are unique per pass.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityRef(String);

impl EntityRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the host should build. Parameters are the ones a renderer needs to reproduce
/// the visual; meshes and materials are the host's business.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityKind {
    /// Empty parent grouping a channel's entities.
    Group,
    /// Shared model. `source` names an existing scene object to use instead of the
    /// built-in shape.
    Model { shape: Shape, source: Option<String> },
    /// Linked duplicate of a model.
    Instance { model: EntityRef },
    /// Subdivided plane whose faces get hooked to notes.
    Grid { x_segments: u32, y_segments: u32 },
    /// Hook moving one face of a grid.
    Hook { grid: EntityRef, face: i32 },
    PointLight,
    /// Landing target of a fountain solo.
    Target { pitch_class: u8, octave: u8, sharp: bool, rotation: f64 },
    /// Static collider (walls, kill planes).
    Collider { kill: bool },
    /// Disposable ball of a splash wall.
    Projectile { pitch_class: u8, octave: u8 },
    /// Particle emission running between two frames.
    Burst {
        emitter: EntityRef,
        frame_start: f64,
        frame_end: f64,
        count: u32,
        lifetime: f64,
        aim: [f64; 3],
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Cube,
    Plane,
    IcoSphere,
    UvSphere,
    Cylinder,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntityRequest {
    pub name: String,
    #[serde(flatten)]
    pub kind: EntityKind,
    pub parent: Option<EntityRef>,
    pub location: [f64; 3],
}

impl EntityRequest {
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        Self { name: name.into(), kind, parent: None, location: [0.0; 3] }
    }

    pub fn parent(mut self, parent: &EntityRef) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    pub fn at(mut self, x: f64, y: f64, z: f64) -> Self {
        self.location = [x, y, z];
        self
    }
}

/// One keyframe: `property` of `entity` takes `value` at `frame`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnimationSample {
    pub entity: EntityRef,
    pub property: String,
    pub frame: f64,
    pub value: f64,
}

impl AnimationSample {
    /// Frames before the start of the timeline are clamped to 0.
    pub fn new(entity: &EntityRef, property: &str, frame: f64, value: f64) -> Self {
        Self {
            entity: entity.clone(),
            property: property.to_string(),
            frame: frame.max(0.0),
            value,
        }
    }
}

/// Receiver of entity requests and samples.
pub trait Scene {
    fn create(&mut self, request: EntityRequest) -> EntityRef;
    fn key(&mut self, sample: AnimationSample);
}

/// Scene that just records what it was asked to do.
#[derive(Debug, Default, Serialize)]
pub struct Recorder {
    pub entities: Vec<EntityRequest>,
    pub samples: Vec<AnimationSample>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples of one property of one entity, in emission order.
    pub fn track(&self, entity: &str, property: &str) -> Vec<(f64, f64)> {
        self.samples
            .iter()
            .filter(|s| s.entity.name() == entity && s.property == property)
            .map(|s| (s.frame, s.value))
            .collect()
    }

    pub fn entity(&self, name: &str) -> Option<&EntityRequest> {
        self.entities.iter().find(|e| e.name == name)
    }
}

impl Scene for Recorder {
    fn create(&mut self, request: EntityRequest) -> EntityRef {
        let handle = EntityRef::new(request.name.clone());
        self.entities.push(request);
        handle
    }

    fn key(&mut self, sample: AnimationSample) {
        self.samples.push(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_clamp_negative_frames() {
        let e = EntityRef::new("BG_0_60");
        assert_eq!(AnimationSample::new(&e, "scale.z", -4.0, 1.0).frame, 0.0);
        assert_eq!(AnimationSample::new(&e, "scale.z", 4.5, 1.0).frame, 4.5);
    }

    #[test]
    fn recorder_hands_back_named_refs() {
        let mut rec = Recorder::new();
        let group = rec.create(EntityRequest::new("LT_1_Parent", EntityKind::Group));
        let light = rec.create(EntityRequest::new("LT_1_60", EntityKind::PointLight).parent(&group).at(0.0, 0.0, 4.0));
        assert_eq!(light.name(), "LT_1_60");
        rec.key(AnimationSample::new(&light, "energy", 10.0, 5.0));

        assert_eq!(rec.entity("LT_1_60").unwrap().parent.as_ref(), Some(&group));
        assert_eq!(rec.track("LT_1_60", "energy"), vec![(10.0, 5.0)]);
        assert!(rec.track("LT_1_60", "scale.z").is_empty());
    }

    #[test]
    fn serializes_entity_kind_inline() {
        let req = EntityRequest::new("GD_2", EntityKind::Grid { x_segments: 37, y_segments: 34 });
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["kind"], "grid");
        assert_eq!(json["x_segments"], 37);
        assert_eq!(json["name"], "GD_2");
    }
}
