use crate::SceneError;
use crate::geometry::Shape;
use crate::material::Material;
use glam::{Quat, Vec3, Vec4};
use knotlab_common::Transform;

/// Index of an object within its scene. Stable for the scene's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

/// A point light. Only affects shaders that read the scene's lights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub color: Vec3,
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Mesh { shape: Shape, material: Material },
    Light(PointLight),
}

/// One entry of the scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    pub transform: Transform,
    pub visible: bool,
    /// Angular velocity in radians per second around each axis.
    pub spin: Vec3,
}

impl SceneObject {
    pub fn mesh(name: impl Into<String>, shape: Shape, material: Material) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::Mesh { shape, material },
            transform: Transform::default(),
            visible: true,
            spin: Vec3::ZERO,
        }
    }

    pub fn light(name: impl Into<String>, light: PointLight, position: Vec3) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::Light(light),
            transform: Transform::from_position(position),
            visible: true,
            spin: Vec3::ZERO,
        }
    }

    pub fn at(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn spinning(mut self, spin: Vec3) -> Self {
        self.spin = spin;
        self
    }

    pub fn material(&self) -> Option<&Material> {
        match &self.kind {
            ObjectKind::Mesh { material, .. } => Some(material),
            ObjectKind::Light(_) => None,
        }
    }

    pub fn material_mut(&mut self) -> Option<&mut Material> {
        match &mut self.kind {
            ObjectKind::Mesh { material, .. } => Some(material),
            ObjectKind::Light(_) => None,
        }
    }

    pub fn shape(&self) -> Option<&Shape> {
        match &self.kind {
            ObjectKind::Mesh { shape, .. } => Some(shape),
            ObjectKind::Light(_) => None,
        }
    }
}

/// Ordered set of objects sharing one coordinate space.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    objects: Vec<SceneObject>,
    subject: Option<ObjectId>,
    /// Clear colour (linear RGBA).
    pub background: Vec4,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            subject: None,
            background: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }

    pub fn with_background(mut self, color: Vec4) -> Self {
        self.background = color;
        self
    }

    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        let id = ObjectId(self.objects.len());
        self.objects.push(object);
        id
    }

    /// Add the mesh the render sequence rewires every pass.
    pub fn add_subject(&mut self, object: SceneObject) -> Result<ObjectId, SceneError> {
        let id = self.add(object);
        self.set_subject(id)?;
        Ok(id)
    }

    pub fn set_subject(&mut self, id: ObjectId) -> Result<(), SceneError> {
        let object = self.objects.get(id.0).ok_or(SceneError::NoSuchObject(id))?;
        if object.material().is_none() {
            return Err(SceneError::NotAMesh(id));
        }
        self.subject = Some(id);
        Ok(())
    }

    pub fn subject(&self) -> Option<ObjectId> {
        self.subject
    }

    pub fn subject_object(&self) -> Option<&SceneObject> {
        self.subject.and_then(|id| self.objects.get(id.0))
    }

    pub fn subject_material(&self) -> Option<&Material> {
        self.subject_object().and_then(SceneObject::material)
    }

    pub fn subject_material_mut(&mut self) -> Option<&mut Material> {
        let id = self.subject?;
        self.objects.get_mut(id.0).and_then(SceneObject::material_mut)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn set_visible(&mut self, id: ObjectId, visible: bool) -> Result<(), SceneError> {
        let object = self
            .objects
            .get_mut(id.0)
            .ok_or(SceneError::NoSuchObject(id))?;
        object.visible = visible;
        Ok(())
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (ObjectId(i), o))
    }

    /// Visible meshes in insertion order.
    pub fn visible_meshes(&self) -> impl Iterator<Item = (ObjectId, &SceneObject, &Shape, &Material)> {
        self.objects().filter_map(|(id, o)| match &o.kind {
            ObjectKind::Mesh { shape, material } if o.visible => Some((id, o, shape, material)),
            _ => None,
        })
    }

    /// Visible point lights with their world positions.
    pub fn lights(&self) -> impl Iterator<Item = (Vec3, &PointLight)> {
        self.objects.iter().filter_map(|o| match &o.kind {
            ObjectKind::Light(light) if o.visible => Some((o.transform.position, light)),
            _ => None,
        })
    }

    pub fn materials_mut(&mut self) -> impl Iterator<Item = &mut Material> {
        self.objects.iter_mut().filter_map(SceneObject::material_mut)
    }

    /// Advance per-object spin by `dt` seconds.
    pub fn animate(&mut self, dt: f32) {
        for object in &mut self.objects {
            if object.spin == Vec3::ZERO {
                continue;
            }
            let delta = Quat::from_euler(
                glam::EulerRot::XYZ,
                object.spin.x * dt,
                object.spin.y * dt,
                object.spin.z * dt,
            );
            object.transform.rotation = (delta * object.transform.rotation).normalize();
        }
    }
}
