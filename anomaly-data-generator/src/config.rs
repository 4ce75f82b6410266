/// Nested pipeline settings loaded from a JSON configuration file.
use crate::error::PipelineError;
use constants::render_settings::RenderSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Seed for the run's owned pseudo-random generator
    pub seed: u64,
    pub file_paths: FilePaths,
    pub input_paths: InputPaths,
    pub model: ModelSettings,
    pub anomaly_settings: AnomalySettings,
    pub camera_setting: CameraSettings,
    pub light_setting: LightSettings,
    pub point_cloud: PointCloudSettings,
    #[serde(default)]
    pub render: RenderSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePaths {
    /// Path to the reference model STL
    pub model_path: PathBuf,
}

/// Output directory layout. Directories are created with exist-ok
/// semantics and never cleared; reruns overwrite by filename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputPaths {
    pub mesh_path_reference: PathBuf,
    pub anomaly_path: PathBuf,
    pub point_cloud_path: PathBuf,
    pub renders_path: PathBuf,
    pub dataset_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Number of horizontal slice variants derived from the reference
    pub num_of_bisect: usize,
    /// Normal/anomaly cloud variations generated per mesh variant
    pub num_generations: usize,
}

/// Half-normal location/scale pairs for the anomaly shape draws plus
/// the pull/push gate probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalySettings {
    pub sigma_loc: f64,
    pub sigma_scale: f64,
    pub strength_loc: f64,
    pub strength_scale: f64,
    pub influence_radius_loc: f64,
    pub influence_radius_scale: f64,
    /// Probability of pulling the surface outward (+1 direction sign)
    pub pull_prob: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSettings {
    pub radius: f64,
    pub height: f64,
    pub num_of_cameras: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightSettings {
    pub radius: f64,
    pub num_lights: usize,
    pub energy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointCloudSettings {
    pub fraction_of_points: f64,
    pub fraction_of_variation: f64,
    pub std_scale: f64,
}

impl PipelineConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let content = fs::read_to_string(path)?;
        let mut config: PipelineConfig = serde_json::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<(), PipelineError> {
        // the gate probability is clamped, not rejected
        self.anomaly_settings.pull_prob = self.anomaly_settings.pull_prob.clamp(0.0, 1.0);

        for (name, value) in [
            ("sigma_scale", self.anomaly_settings.sigma_scale),
            ("strength_scale", self.anomaly_settings.strength_scale),
            (
                "influence_radius_scale",
                self.anomaly_settings.influence_radius_scale,
            ),
            ("std_scale", self.point_cloud.std_scale),
        ] {
            if value < 0.0 {
                return Err(PipelineError::Config(format!(
                    "{name} must be nonnegative, got {value}"
                )));
            }
        }

        if self.camera_setting.num_of_cameras == 0 {
            return Err(PipelineError::Config(
                "camera_setting.num_of_cameras must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.point_cloud.fraction_of_points)
            || self.point_cloud.fraction_of_points == 0.0
        {
            return Err(PipelineError::Config(format!(
                "point_cloud.fraction_of_points must be in (0, 1], got {}",
                self.point_cloud.fraction_of_points
            )));
        }

        Ok(())
    }

    /// Create every configured output directory (exist-ok).
    pub fn ensure_directories(&self) -> Result<(), PipelineError> {
        for path in [
            &self.input_paths.mesh_path_reference,
            &self.input_paths.anomaly_path,
            &self.input_paths.point_cloud_path,
            &self.input_paths.renders_path,
            &self.input_paths.dataset_path,
        ] {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json(dir: &Path) -> PathBuf {
        let config = serde_json::json!({
            "seed": 42,
            "file_paths": { "model_path": "assets/widget.stl" },
            "input_paths": {
                "mesh_path_reference": dir.join("meshes/reference"),
                "anomaly_path": dir.join("meshes/anomaly"),
                "point_cloud_path": dir.join("point_clouds"),
                "renders_path": dir.join("renders"),
                "dataset_path": dir.join("dataset")
            },
            "model": { "num_of_bisect": 10, "num_generations": 2 },
            "anomaly_settings": {
                "sigma_loc": 0.05, "sigma_scale": 0.05,
                "strength_loc": 0.03, "strength_scale": 0.02,
                "influence_radius_loc": 0.2, "influence_radius_scale": 0.1,
                "pull_prob": 1.7
            },
            "camera_setting": { "radius": 5.0, "height": 3.0, "num_of_cameras": 6 },
            "light_setting": { "radius": 4.0, "num_lights": 4, "energy": 800.0 },
            "point_cloud": {
                "fraction_of_points": 0.1,
                "fraction_of_variation": 0.3,
                "std_scale": 0.01
            }
        });
        let path = dir.join("main_config.json");
        fs::write(&path, config.to_string()).unwrap();
        path
    }

    #[test]
    fn loads_and_clamps_the_pull_probability() {
        let dir = std::env::temp_dir().join("anomaly-data-generator-tests/config");
        fs::create_dir_all(&dir).unwrap();
        let path = sample_json(&dir);

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.anomaly_settings.pull_prob, 1.0);
        // render settings fall back to defaults when absent
        assert_eq!(config.render.resolution_x, 640);

        config.ensure_directories().unwrap();
        assert!(config.input_paths.dataset_path.is_dir());
        // exist-ok: a second call succeeds
        config.ensure_directories().unwrap();
    }

    #[test]
    fn rejects_a_negative_scale() {
        let dir = std::env::temp_dir().join("anomaly-data-generator-tests/config-bad");
        fs::create_dir_all(&dir).unwrap();
        let path = sample_json(&dir);
        let content = fs::read_to_string(&path)
            .unwrap()
            .replace("\"sigma_scale\":0.05", "\"sigma_scale\":-0.5");
        fs::write(&path, content).unwrap();

        assert!(matches!(
            PipelineConfig::from_file(&path),
            Err(PipelineError::Config(_))
        ));
    }
}
