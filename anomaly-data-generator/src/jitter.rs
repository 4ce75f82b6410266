/// Fractional subsampling and measurement-noise jitter applied to a
/// labeled cloud before it is persisted as CSV + LAS.
use crate::error::PipelineError;
use crate::point_cloud::{PointCloud, write_labeled_csv};
use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::seq::index;
use rand_distr::{Distribution, Normal};
use std::path::{Path, PathBuf};

/// Subsample and noise settings for one exported cloud.
#[derive(Debug, Clone, Copy)]
pub struct CloudExportSettings {
    /// Fraction of sampled points kept in the exported cloud
    pub fraction_of_points: f64,
    /// Fraction of the kept points that receive z jitter
    pub fraction_of_variation: f64,
    /// Standard deviation of the multiplicative z noise
    pub std_scale: f64,
    /// Disable to export an exact (reference) subsample
    pub randomization: bool,
}

/// Draw a random fraction of the labeled cloud, optionally jitter the z
/// coordinate of a sub-fraction of it, and persist the result as
/// `<stem>.csv` and `<stem>.las`. Returns the CSV path.
pub fn random_cloud_points(
    points: &[Point3<f64>],
    labels: &[bool],
    file_stem: &Path,
    settings: &CloudExportSettings,
    rng: &mut StdRng,
) -> Result<PathBuf, PipelineError> {
    let keep = ((points.len() as f64 * settings.fraction_of_points).round() as usize)
        .min(points.len());

    let chosen = index::sample(rng, points.len(), keep);
    let mut sampled_points: Vec<Point3<f64>> = chosen.iter().map(|i| points[i]).collect();
    let sampled_labels: Vec<bool> = chosen.iter().map(|i| labels[i]).collect();

    if settings.randomization {
        // Multiplicative z noise on a random sub-fraction, modelling
        // per-print surface variation.
        let varied = (keep as f64 * settings.fraction_of_variation) as usize;
        let noise = Normal::new(0.0, settings.std_scale)
            .map_err(|e| PipelineError::Config(format!("bad std_scale: {e}")))?;
        for i in index::sample(rng, keep, varied.min(keep)) {
            let z = sampled_points[i].z;
            sampled_points[i].z = z + z * noise.sample(rng);
        }
    }

    let csv_path = PathBuf::from(format!("{}.csv", file_stem.display()));
    write_labeled_csv(&csv_path, &sampled_points, &sampled_labels)?;

    let las_path = PathBuf::from(format!("{}.las", file_stem.display()));
    PointCloud::new(sampled_points).write_las(&las_path)?;

    Ok(csv_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point_cloud::read_labeled_csv;
    use rand::SeedableRng;

    fn settings(randomization: bool) -> CloudExportSettings {
        CloudExportSettings {
            fraction_of_points: 0.5,
            fraction_of_variation: 0.3,
            std_scale: 1e-2,
            randomization,
        }
    }

    fn grid_points(n: usize) -> (Vec<Point3<f64>>, Vec<bool>) {
        let points = (0..n)
            .map(|i| Point3::new(i as f64, (i * 3 % 11) as f64, 1.0 + (i % 5) as f64))
            .collect();
        let labels = (0..n).map(|i| i % 4 == 0).collect();
        (points, labels)
    }

    fn temp_stem(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("anomaly-data-generator-tests");
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn keeps_the_requested_fraction() {
        let (points, labels) = grid_points(200);
        let mut rng = StdRng::seed_from_u64(5);
        let csv = random_cloud_points(
            &points,
            &labels,
            &temp_stem("fraction"),
            &settings(false),
            &mut rng,
        )
        .unwrap();

        let (restored, _) = read_labeled_csv(&csv).unwrap();
        assert_eq!(restored.len(), 100);
    }

    #[test]
    fn without_randomization_points_are_exact_subsamples() {
        let (points, labels) = grid_points(100);
        let mut rng = StdRng::seed_from_u64(6);
        let csv = random_cloud_points(
            &points,
            &labels,
            &temp_stem("exact"),
            &settings(false),
            &mut rng,
        )
        .unwrap();

        let (restored, _) = read_labeled_csv(&csv).unwrap();
        for p in &restored {
            assert!(points.iter().any(|q| (p - q).norm() < 1e-9));
        }
    }

    #[test]
    fn randomization_only_touches_z() {
        let (points, labels) = grid_points(100);
        let mut rng = StdRng::seed_from_u64(7);
        let csv = random_cloud_points(
            &points,
            &labels,
            &temp_stem("jitter"),
            &settings(true),
            &mut rng,
        )
        .unwrap();

        let (restored, _) = read_labeled_csv(&csv).unwrap();
        for p in &restored {
            // every exported point shares x/y with some source point
            assert!(
                points
                    .iter()
                    .any(|q| (p.x - q.x).abs() < 1e-9 && (p.y - q.y).abs() < 1e-9)
            );
        }
    }
}
