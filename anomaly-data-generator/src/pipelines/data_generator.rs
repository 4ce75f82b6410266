/// Dataset generation pipeline: reference export, bisect variants,
/// visibility culling, labeled cloud sampling and the distance dataset.
use crate::anomaly::{AnomalyParams, apply_anomaly};
use crate::bisect::bisect_function;
use crate::cameras::create_cameras_around_object;
use crate::config::PipelineConfig;
use crate::dataset::{generate_distance_csvs, get_reference_pairs};
use crate::error::PipelineError;
use crate::jitter::{CloudExportSettings, random_cloud_points};
use crate::sampling::mesh_to_point_clouds;
use crate::scene::Scene;
use crate::visibility::cull_and_export;
use constants::sampling::{POINTS_PER_TRIANGLE, VERTEX_SAMPLE_MULTIPLIER};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Orchestrates one full dataset generation run over every mesh variant.
pub struct DataGenerator<'a> {
    config: &'a PipelineConfig,
}

impl<'a> DataGenerator<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the complete pipeline: export the reference mesh, derive the
    /// bisect variants, then produce reference/normal/anomaly clouds per
    /// variant and join them into distance datasets.
    pub fn run(
        &self,
        scene: &mut Scene,
        rng: &mut StdRng,
    ) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
        println!("Generating data");
        self.config.ensure_directories()?;

        // Add original mesh object to dataset
        let original = self.add_original_mesh(scene)?;
        let mut mesh_paths = vec![original.clone()];

        // Create bisects
        mesh_paths.extend(self.create_bisects(&original, scene)?);

        // Create point clouds
        self.generate_point_clouds(scene, rng, &mesh_paths)?;

        // Join candidate clouds with reference distances
        let pairs = get_reference_pairs(&self.config.input_paths.point_cloud_path)?;
        let datasets = generate_distance_csvs(&pairs, &self.config.input_paths.dataset_path)?;
        let written: usize = datasets.values().map(Vec::len).sum();
        println!("Wrote {written} distance datasets");

        Ok(mesh_paths)
    }

    /// Export the imported reference model into the reference mesh
    /// directory and return its path.
    fn add_original_mesh(&self, scene: &mut Scene) -> Result<PathBuf, PipelineError> {
        let main_mesh_path = &self.config.file_paths.model_path;
        let main_mesh_name = file_stem(main_mesh_path);

        scene.clear();
        scene.load_mesh_from_stl(main_mesh_path)?;
        let file_path = self
            .config
            .input_paths
            .mesh_path_reference
            .join(format!("reference_{main_mesh_name}.stl"));
        scene.export_active_mesh(&file_path)?;
        scene.clear();

        Ok(file_path)
    }

    fn create_bisects(
        &self,
        mesh_path: &Path,
        scene: &mut Scene,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        bisect_function(
            mesh_path,
            &self.config.input_paths.mesh_path_reference,
            self.config.model.num_of_bisect,
            scene,
        )
    }

    /// Produce the per-variant point clouds. A failing variant is logged
    /// and skipped so one bad mesh never aborts the remaining batch.
    fn generate_point_clouds(
        &self,
        scene: &mut Scene,
        rng: &mut StdRng,
        mesh_paths: &[PathBuf],
    ) -> Result<(), PipelineError> {
        for folder in ["reference", "normal", "anomaly"] {
            std::fs::create_dir_all(self.config.input_paths.point_cloud_path.join(folder))?;
        }

        // Cameras are set up once around the main model and reused for
        // every variant's visibility cull.
        scene.clear();
        scene.load_mesh_from_stl(&self.config.file_paths.model_path)?;
        let cameras = {
            let mesh = scene.active_mesh_ref()?;
            create_cameras_around_object(
                mesh,
                self.config.camera_setting.radius,
                self.config.camera_setting.height,
                self.config.camera_setting.num_of_cameras,
                1.0,
            )
        };
        scene.cameras = cameras;

        let pb = ProgressBar::new(mesh_paths.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.green/blue}] {pos}/{len} mesh variants ({percent}%) {msg}")
                .unwrap()
                .progress_chars("▉▊▋▌▍▎▏ "),
        );
        pb.set_message("Generating point clouds");

        for mesh_path in mesh_paths {
            if let Err(e) = self.process_mesh_variant(scene, rng, mesh_path) {
                pb.suspend(|| {
                    eprintln!("Skipping variant {}: {e}", mesh_path.display());
                });
            }
            pb.inc(1);
        }
        pb.finish_with_message("Point clouds generated");

        Ok(())
    }

    fn process_mesh_variant(
        &self,
        scene: &mut Scene,
        rng: &mut StdRng,
        mesh_path: &Path,
    ) -> Result<(), PipelineError> {
        let stem = file_stem(mesh_path);
        let point_cloud_path = &self.config.input_paths.point_cloud_path;
        let reference_stem = point_cloud_path.join("reference").join(&stem);

        // Reduce the variant to camera-visible geometry once; every
        // cloud of this variant samples the culled mesh.
        scene.clear();
        scene.load_mesh_from_stl(mesh_path)?;
        let vray_path = PathBuf::from(format!("{}_vray.stl", reference_stem.display()));
        let mesh_path_vray = cull_and_export(scene, &vray_path)?;

        self.create_point_cloud(scene, rng, &mesh_path_vray, &reference_stem, false, false)?;

        for version in 0..self.config.model.num_generations {
            let normal_stem = point_cloud_path.join("normal").join(format!(
                "{}_v{version}",
                stem.replace("reference", "normal")
            ));
            self.create_point_cloud(scene, rng, &mesh_path_vray, &normal_stem, true, false)?;

            let anomaly_stem = point_cloud_path.join("anomaly").join(format!(
                "{}_v{version}",
                stem.replace("reference", "anomaly")
            ));
            self.create_point_cloud(scene, rng, &mesh_path_vray, &anomaly_stem, true, true)?;
        }

        Ok(())
    }

    /// Load the culled variant, optionally inject an anomaly, sample a
    /// labeled cloud and persist it under `file_stem`.
    fn create_point_cloud(
        &self,
        scene: &mut Scene,
        rng: &mut StdRng,
        mesh_path: &Path,
        file_stem: &Path,
        randomization: bool,
        anomaly: bool,
    ) -> Result<(), PipelineError> {
        scene.clear();
        scene.load_mesh_from_stl(mesh_path)?;

        let anomaly_vertices = if anomaly {
            self.create_anomaly(scene, rng, file_stem)?
        } else {
            HashSet::new()
        };

        let mesh = scene.active_mesh()?;
        let sample_size = VERTEX_SAMPLE_MULTIPLIER * mesh.num_vertices();
        let (points, labels) = mesh_to_point_clouds(
            mesh,
            sample_size,
            &anomaly_vertices,
            POINTS_PER_TRIANGLE,
            rng,
        )?;

        let export = CloudExportSettings {
            fraction_of_points: self.config.point_cloud.fraction_of_points,
            fraction_of_variation: self.config.point_cloud.fraction_of_variation,
            std_scale: self.config.point_cloud.std_scale,
            randomization,
        };
        random_cloud_points(&points, &labels, file_stem, &export, rng)?;

        Ok(())
    }

    /// Draw anomaly shape parameters from their half-normal priors, gate
    /// the direction sign on `pull_prob`, and displace the active mesh.
    /// The anomalous mesh is exported for the render pipeline.
    fn create_anomaly(
        &self,
        scene: &mut Scene,
        rng: &mut StdRng,
        file_stem: &Path,
    ) -> Result<HashSet<u32>, PipelineError> {
        let settings = &self.config.anomaly_settings;

        let params = AnomalyParams {
            sigma: half_normal(settings.sigma_loc, settings.sigma_scale, rng)?,
            strength: half_normal(settings.strength_loc, settings.strength_scale, rng)?,
            influence_radius: half_normal(
                settings.influence_radius_loc,
                settings.influence_radius_scale,
                rng,
            )?,
            direction_sign: if rng.random::<f64>() < settings.pull_prob {
                1.0
            } else {
                -1.0
            },
        };

        let mesh = scene.active_mesh()?;
        let anomaly_vertices = apply_anomaly(mesh, &params, rng)?;

        let mesh_file = self.config.input_paths.anomaly_path.join(format!(
            "{}.stl",
            file_stem
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "anomaly".to_string())
        ));
        scene.export_active_mesh(&mesh_file)?;

        Ok(anomaly_vertices)
    }
}

/// Half-normal draw: `loc + |N(0, scale)|`.
fn half_normal(loc: f64, scale: f64, rng: &mut StdRng) -> Result<f64, PipelineError> {
    let normal = Normal::new(0.0, scale)
        .map_err(|e| PipelineError::Config(format!("bad half-normal scale {scale}: {e}")))?;
    Ok(loc + normal.sample(rng).abs())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}
