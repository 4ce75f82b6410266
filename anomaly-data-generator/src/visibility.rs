/// Visibility culler: ray-casts every camera pixel into the mesh and
/// deletes the faces no ray ever strikes, keeping only the geometry an
/// external scanner could actually observe.
use crate::cameras::{Camera, linspace};
use crate::error::PipelineError;
use crate::mesh::Mesh;
use crate::ray::{MeshRaycaster, Ray};
use crate::scene::Scene;
use constants::render_settings::RenderSettings;
use indicatif::{ProgressBar, ProgressStyle};
use nalgebra::Vector3;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Collect the polygon indices struck by at least one pixel ray from at
/// least one camera. Hits accumulate into a single union set across all
/// cameras; per-column casting runs in parallel, which is safe because
/// set union is order independent.
pub fn visible_faces(mesh: &Mesh, cameras: &[Camera], settings: &RenderSettings) -> HashSet<u32> {
    let caster = MeshRaycaster::new(mesh);
    let (resolution_x, resolution_y) = settings.effective_resolution();

    let pb = ProgressBar::new((cameras.len() * resolution_x) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} pixel columns ({percent}%) {msg}")
            .unwrap()
            .progress_chars("▉▊▋▌▍▎▏ "),
    );
    pb.set_message("Casting visibility rays");

    let mut faces_set: HashSet<u32> = HashSet::new();
    for cam in cameras {
        let frame = cam.view_frame(settings);

        // setup vectors to match pixels
        let x_range = linspace(frame.top_left.x, frame.top_right.x, resolution_x);
        let y_range = linspace(frame.top_left.y, frame.bottom_left.y, resolution_y);

        // Meshes are loaded with their transform baked, so the camera
        // origin is already in the mesh's local frame.
        let origin = cam.position;

        let camera_hits = x_range
            .par_iter()
            .map(|&x| {
                let mut column_hits = HashSet::new();
                for &y in &y_range {
                    let pixel = Vector3::new(x, y, frame.top_left.z);
                    let ray = Ray::new(origin, cam.pixel_direction(pixel));
                    if let Some(hit) = caster.cast(&ray) {
                        column_hits.insert(hit.polygon_index);
                    }
                }
                pb.inc(1);
                column_hits
            })
            .reduce(HashSet::new, |mut a, b| {
                a.extend(b);
                a
            });

        faces_set.extend(camera_hits);
    }
    pb.finish_with_message("Visibility rays cast");

    faces_set
}

/// Delete every face not struck by any camera ray. Face identifiers are
/// indices into the face table at cull time, so this must run before
/// any later reindexing. Returns the number of faces removed.
pub fn cull_occluded(mesh: &mut Mesh, cameras: &[Camera], settings: &RenderSettings) -> usize {
    let before = mesh.num_polygons();
    let keep = visible_faces(mesh, cameras, settings);
    mesh.delete_polygons_not_in(&keep);
    before - mesh.num_polygons()
}

/// Cull the scene's active mesh against the scene cameras and export the
/// reduced mesh. Returns the written path.
pub fn cull_and_export(scene: &mut Scene, file_path: &Path) -> Result<PathBuf, PipelineError> {
    let cameras = scene.cameras.clone();
    let settings = scene.render.clone();
    let mesh = scene.active_mesh()?;

    let removed = cull_occluded(mesh, &cameras, &settings);
    println!(
        "Culled {} occluded faces, {} remain",
        removed,
        mesh.num_polygons()
    );

    scene.export_active_mesh(file_path)
}
