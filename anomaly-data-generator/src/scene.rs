/// Explicit scene context replacing the render host's shared object graph.
///
/// One `Scene` is owned by a pipeline run. Components receive the mesh
/// they operate on as a parameter; the only name lookup left is
/// `object_by_name`, kept at the orchestration edge where a miss means a
/// caller ordering bug.
use crate::cameras::Camera;
use crate::error::PipelineError;
use crate::lights::PointLight;
use crate::mesh::{self, Mesh};
use constants::coordinate_system::transform_coordinates;
use constants::render_settings::RenderSettings;
use nalgebra::Point3;
use std::path::{Path, PathBuf};

pub struct Scene {
    pub render: RenderSettings,
    pub cameras: Vec<Camera>,
    pub lights: Vec<PointLight>,
    active: Option<Mesh>,
}

impl Scene {
    pub fn new(render: RenderSettings) -> Self {
        Self {
            render,
            cameras: Vec::new(),
            lights: Vec::new(),
            active: None,
        }
    }

    /// Drop the active mesh and its colour layers. Cameras and lights
    /// survive, matching the host's reset behaviour. Must run before
    /// every mesh-variant iteration; stale meshes across iterations are
    /// a correctness bug, not a leak.
    pub fn clear(&mut self) {
        self.active = None;
    }

    /// Import a mesh, run it through the shared coordinate transform
    /// (identity by default), move its origin to the geometry centre and
    /// clear its location, then make it the active object.
    pub fn load_mesh_from_stl(&mut self, path: &Path) -> Result<&mut Mesh, PipelineError> {
        let mut loaded = mesh::read_stl(path)?;
        for v in &mut loaded.vertices {
            let (x, y, z) = transform_coordinates(v.x, v.y, v.z);
            *v = Point3::new(x, y, z);
        }
        loaded.center_at_origin();
        Ok(self.active.insert(loaded))
    }

    pub fn active_mesh(&mut self) -> Result<&mut Mesh, PipelineError> {
        self.active
            .as_mut()
            .ok_or_else(|| PipelineError::ObjectNotFound("<active mesh>".to_string()))
    }

    pub fn active_mesh_ref(&self) -> Result<&Mesh, PipelineError> {
        self.active
            .as_ref()
            .ok_or_else(|| PipelineError::ObjectNotFound("<active mesh>".to_string()))
    }

    /// Name-based lookup retained for orchestration-edge assertions. A
    /// miss is a programming-contract violation (object not loaded
    /// before use), never a recoverable condition.
    pub fn object_by_name(&mut self, name: &str) -> Result<&mut Mesh, PipelineError> {
        match self.active.as_mut() {
            Some(mesh) if mesh.name == name => Ok(mesh),
            _ => Err(PipelineError::ObjectNotFound(name.to_string())),
        }
    }

    /// Export the active mesh as STL and return the written path.
    pub fn export_active_mesh(&self, path: &Path) -> Result<PathBuf, PipelineError> {
        let mesh = self.active_mesh_ref()?;
        mesh::write_stl(mesh, path)?;
        Ok(path.to_path_buf())
    }
}
