/// Render pipeline: sweeps every mesh kind through the camera ring and
/// the half-sphere lights, one light on at a time.
use crate::cameras::create_cameras_around_object;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::lights::{create_lights_on_half_sphere, turn_on_one_light};
use crate::render::render_object;
use crate::scene::Scene;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use std::fs;
use std::path::{Path, PathBuf};

/// Mesh variants discovered for rendering, keyed by kind.
#[derive(Debug, Clone)]
pub struct MeshList {
    pub main_object: PathBuf,
    pub bisect: Vec<PathBuf>,
    pub anomaly: Vec<PathBuf>,
}

pub struct ImageRender<'a> {
    config: &'a PipelineConfig,
}

impl<'a> ImageRender<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Discover the mesh variants produced by the data pipeline.
    pub fn generate_mesh_list(&self) -> Result<MeshList, PipelineError> {
        Ok(MeshList {
            main_object: self.config.file_paths.model_path.clone(),
            bisect: stl_files(&self.config.input_paths.mesh_path_reference)?
                .into_iter()
                .filter(|p| file_stem(p).contains("bisect"))
                .collect(),
            anomaly: stl_files(&self.config.input_paths.anomaly_path)?,
        })
    }

    /// Render reference, normal and anomaly image sets.
    pub fn run(
        &self,
        scene: &mut Scene,
        rng: &mut StdRng,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mesh_list = self.generate_mesh_list()?;

        let mut renders_paths: Vec<(&str, PathBuf)> = Vec::new();
        for folder in ["reference", "normal", "anomaly"] {
            let path = self.config.input_paths.renders_path.join(folder);
            fs::create_dir_all(&path)?;
            renders_paths.push((folder, path));
        }

        // Cameras and lights are placed once around the main object.
        scene.clear();
        scene.load_mesh_from_stl(&self.config.file_paths.model_path)?;
        let (cameras, lights) = {
            let mesh = scene.active_mesh_ref()?;
            (
                create_cameras_around_object(
                    mesh,
                    self.config.camera_setting.radius,
                    self.config.camera_setting.height,
                    self.config.camera_setting.num_of_cameras,
                    1.0,
                ),
                create_lights_on_half_sphere(
                    mesh,
                    self.config.light_setting.radius,
                    self.config.light_setting.num_lights,
                    self.config.light_setting.energy,
                    rng,
                ),
            )
        };
        scene.cameras = cameras;
        scene.lights = lights;

        let num_generations = self.config.model.num_generations;
        let reference_meshes: Vec<&PathBuf> = std::iter::once(&mesh_list.main_object)
            .chain(mesh_list.bisect.iter())
            .collect();

        let per_mesh = scene.cameras.len() * scene.lights.len();
        let total = reference_meshes.len() * per_mesh * (1 + num_generations)
            + mesh_list.anomaly.len() * per_mesh;
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.green/blue}] {pos}/{len} renders ({percent}%) {msg}")
                .unwrap()
                .progress_chars("▉▊▋▌▍▎▏ "),
        );
        pb.set_message("Rendering");

        // render reference
        for &obj_path in &reference_meshes {
            self.render_sweep(scene, obj_path, &renders_paths[0].1, "reference", None, &pb)?;
        }

        // render normal variations
        for &obj_path in &reference_meshes {
            for version in 0..num_generations {
                self.render_sweep(
                    scene,
                    obj_path,
                    &renders_paths[1].1,
                    "normal",
                    Some(version),
                    &pb,
                )?;
            }
        }

        // render anomaly variants
        for obj_path in &mesh_list.anomaly {
            self.render_sweep(scene, obj_path, &renders_paths[2].1, "anomaly", None, &pb)?;
        }

        pb.finish_with_message("Renders complete");
        Ok(())
    }

    /// Render one mesh from every camera under every single active
    /// light. The mesh is reloaded and size-normalised per image so no
    /// state leaks between renders.
    fn render_sweep(
        &self,
        scene: &mut Scene,
        obj_path: &Path,
        out_dir: &Path,
        kind: &str,
        version: Option<usize>,
        pb: &ProgressBar,
    ) -> Result<(), PipelineError> {
        let stem = file_stem(obj_path);
        let energy = self.config.light_setting.energy;

        for camera_index in 0..scene.cameras.len() {
            for light_index in 0..scene.lights.len() {
                let camera = scene.cameras[camera_index].clone();
                let suffix = match version {
                    Some(v) => format!("_version_{v}"),
                    None => String::new(),
                };
                let file_path = out_dir.join(format!(
                    "{kind}_{stem}_{}_light{light_index:02}{suffix}.png",
                    camera.name
                ));

                scene.clear();
                let mesh = scene.load_mesh_from_stl(obj_path)?;
                mesh.normalize_size(1.0);

                turn_on_one_light(&mut scene.lights, light_index, energy);

                let mesh = scene.active_mesh_ref()?;
                render_object(mesh, &camera, &scene.lights, &scene.render, &file_path)?;
                pb.inc(1);
            }
        }

        Ok(())
    }
}

fn stl_files(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Ok(files);
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "stl") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}
