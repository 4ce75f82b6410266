/// Distance dataset builder: joins candidate clouds with their
/// nearest-reference-surface distances into tabular training data.
use crate::error::PipelineError;
use crate::point_cloud::{PointCloud, read_labeled_csv};
use constants::labels::REFERENCE_COLOUR;
use nalgebra::Point3;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One training row: position, distance to the reference surface, label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetRow {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub dist: f64,
    pub label: bool,
}

/// Join candidate points with their nearest-neighbour distance to the
/// reference cloud. Row order matches the candidate point order; one
/// row per candidate point, no deduplication.
pub fn build_distance_dataset(
    candidate_points: &[Point3<f64>],
    labels: &[bool],
    reference_points: &[Point3<f64>],
) -> Vec<DatasetRow> {
    let candidate = PointCloud::with_labels(candidate_points.to_vec(), labels);
    let reference = PointCloud::new(reference_points.to_vec()).uniform_colour(REFERENCE_COLOUR);

    let distances = candidate.nearest_distances(&reference);

    candidate
        .points
        .iter()
        .zip(labels)
        .zip(distances)
        .map(|((point, &label), dist)| DatasetRow {
            x: point.x,
            y: point.y,
            z: point.z,
            dist,
            label,
        })
        .collect()
}

/// Pair every candidate cloud CSV under `normal/` and `anomaly/` with
/// its reference CSV. Bisect variants only pair with bisect references;
/// matching is by the reference file name with the `reference` prefix
/// stripped.
pub fn get_reference_pairs(
    point_cloud_dir: &Path,
) -> Result<HashMap<String, Vec<(PathBuf, PathBuf)>>, PipelineError> {
    let mut pairs_of_paths: HashMap<String, Vec<(PathBuf, PathBuf)>> = HashMap::new();
    pairs_of_paths.insert("normal".to_string(), Vec::new());
    pairs_of_paths.insert("anomaly".to_string(), Vec::new());

    let reference_dir = point_cloud_dir.join("reference");
    let reference_names = csv_names(&reference_dir)?;

    for key in ["normal", "anomaly"] {
        let candidate_dir = point_cloud_dir.join(key);
        let candidate_names = csv_names(&candidate_dir)?;

        for reference_name in &reference_names {
            let word_part = reference_name.replace("reference", "").replace(".csv", "");
            let reference_is_bisect = reference_name.contains("bisect");

            for name in &candidate_names {
                if name.contains("bisect") != reference_is_bisect {
                    continue;
                }
                if name.contains(&word_part) {
                    pairs_of_paths.get_mut(key).unwrap().push((
                        candidate_dir.join(name),
                        reference_dir.join(reference_name),
                    ));
                }
            }
        }
    }

    Ok(pairs_of_paths)
}

/// Compute and persist the distance dataset for every candidate /
/// reference pair. Output CSVs keep the candidate file name and land in
/// `dataset_path`; returns the written paths per kind.
pub fn generate_distance_csvs(
    pairs_of_paths: &HashMap<String, Vec<(PathBuf, PathBuf)>>,
    dataset_path: &Path,
) -> Result<HashMap<String, Vec<PathBuf>>, PipelineError> {
    fs::create_dir_all(dataset_path)?;

    let mut dist_data: HashMap<String, Vec<PathBuf>> = HashMap::new();
    for (key, paths) in pairs_of_paths {
        let mut written = Vec::new();
        for (candidate_path, reference_path) in paths {
            let (candidate_points, labels) = read_labeled_csv(candidate_path)?;
            let (reference_points, _) = read_labeled_csv(reference_path)?;

            let rows = build_distance_dataset(&candidate_points, &labels, &reference_points);

            let file_name = candidate_path
                .file_name()
                .ok_or_else(|| {
                    PipelineError::Config(format!(
                        "candidate path has no file name: {}",
                        candidate_path.display()
                    ))
                })?
                .to_os_string();
            let dist_path = dataset_path.join(file_name);
            write_distance_csv(&dist_path, &rows)?;
            written.push(dist_path);
        }
        dist_data.insert(key.clone(), written);
    }

    Ok(dist_data)
}

/// Write `x,y,z,dist,label` rows. The label column is numeric (1.0/0.0),
/// matching the downstream training table layout.
pub fn write_distance_csv(path: &Path, rows: &[DatasetRow]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "x,y,z,dist,label")?;
    for row in rows {
        writeln!(
            out,
            "{},{},{},{},{}",
            row.x,
            row.y,
            row.z,
            row.dist,
            if row.label { "1.0" } else { "0.0" }
        )?;
    }
    out.flush()?;

    Ok(())
}

fn csv_names(dir: &Path) -> Result<Vec<String>, PipelineError> {
    let mut names = Vec::new();
    if !dir.is_dir() {
        return Ok(names);
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(".csv") {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
