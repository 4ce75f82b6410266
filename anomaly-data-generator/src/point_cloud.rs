/// Labeled point clouds: colouring, nearest-distance queries, LAS and
/// CSV persistence.
use crate::error::PipelineError;
use constants::labels::label_colour;
use las::{Builder, Color, Reader, Transform, Vector, Writer};
use nalgebra::Point3;
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Coordinate resolution for LAS integer quantisation
const LAS_SCALE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct PointCloud {
    pub points: Vec<Point3<f64>>,
    pub colours: Option<Vec<[f64; 3]>>,
}

impl PointCloud {
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self {
            points,
            colours: None,
        }
    }

    /// Build a cloud whose per-point colour encodes the anomaly label:
    /// red for anomalies, blue for normal points.
    pub fn with_labels(points: Vec<Point3<f64>>, labels: &[bool]) -> Self {
        let colours = labels.iter().map(|&l| label_colour(l)).collect();
        Self {
            points,
            colours: Some(colours),
        }
    }

    /// Paint every point the same colour (used for reference clouds).
    pub fn uniform_colour(mut self, colour: [f64; 3]) -> Self {
        self.colours = Some(vec![colour; self.points.len()]);
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Nearest-neighbour Euclidean distance from every point of this
    /// cloud to `reference`. Output order matches this cloud's point
    /// order; one distance per point.
    pub fn nearest_distances(&self, reference: &PointCloud) -> Vec<f64> {
        self.points
            .par_iter()
            .map(|p| {
                reference
                    .points
                    .iter()
                    .map(|r| (p - r).norm())
                    .fold(f64::INFINITY, f64::min)
            })
            .collect()
    }

    /// Persist as a binary LAS point cloud (point format 2, RGB).
    pub fn write_las(&self, path: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut builder = Builder::from((1, 4));
        // Point format 2 carries RGB; a plain coordinate cloud (no colours)
        // uses format 0 so each point's attributes match the header.
        let point_format = if self.colours.is_some() { 2 } else { 0 };
        builder.point_format = las::point::Format::new(point_format)?;
        builder.transforms = Vector {
            x: Transform {
                scale: LAS_SCALE,
                offset: 0.0,
            },
            y: Transform {
                scale: LAS_SCALE,
                offset: 0.0,
            },
            z: Transform {
                scale: LAS_SCALE,
                offset: 0.0,
            },
        };
        let header = builder.into_header()?;

        let mut writer = Writer::from_path(path, header)?;
        for (index, point) in self.points.iter().enumerate() {
            let colour = self
                .colours
                .as_ref()
                .map(|c| c[index])
                .map(|c| Color::new(quantise(c[0]), quantise(c[1]), quantise(c[2])));

            writer.write_point(las::Point {
                x: point.x,
                y: point.y,
                z: point.z,
                color: colour,
                ..Default::default()
            })?;
        }
        writer.close()?;

        Ok(())
    }

    /// Read a LAS/LAZ point cloud back into memory.
    pub fn read_las(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path)?;
        let mut reader = Reader::new(BufReader::new(file))?;

        let mut points = Vec::new();
        let mut colours = Vec::new();
        let mut any_colour = false;
        for point in reader.points() {
            let point = point?;
            points.push(Point3::new(point.x, point.y, point.z));
            match point.color {
                Some(c) => {
                    any_colour = true;
                    colours.push([
                        c.red as f64 / 65535.0,
                        c.green as f64 / 65535.0,
                        c.blue as f64 / 65535.0,
                    ]);
                }
                None => colours.push([0.0, 0.0, 0.0]),
            }
        }

        Ok(Self {
            points,
            colours: any_colour.then_some(colours),
        })
    }
}

fn quantise(channel: f64) -> u16 {
    (channel.clamp(0.0, 1.0) * 65535.0).round() as u16
}

/// Write a labeled sample table: `x,y,z,label` with True/False labels.
pub fn write_labeled_csv(
    path: &Path,
    points: &[Point3<f64>],
    labels: &[bool],
) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "x,y,z,label")?;
    for (point, label) in points.iter().zip(labels) {
        writeln!(
            out,
            "{},{},{},{}",
            point.x,
            point.y,
            point.z,
            if *label { "True" } else { "False" }
        )?;
    }
    out.flush()?;

    Ok(())
}

/// Read a labeled sample table back. Accepts True/False in either case
/// and numeric 0/1 labels.
pub fn read_labeled_csv(path: &Path) -> Result<(Vec<Point3<f64>>, Vec<bool>), PipelineError> {
    let reader = BufReader::new(File::open(path)?);
    let mut points = Vec::new();
    let mut labels = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line_no == 0 || line.trim().is_empty() {
            continue; // header
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 4 {
            return Err(PipelineError::Config(format!(
                "short row in `{}` at line {}",
                path.display(),
                line_no + 1
            )));
        }
        let parse = |s: &str| -> Result<f64, PipelineError> {
            s.trim().parse::<f64>().map_err(|_| {
                PipelineError::Config(format!(
                    "bad number `{}` in `{}` at line {}",
                    s,
                    path.display(),
                    line_no + 1
                ))
            })
        };
        points.push(Point3::new(
            parse(fields[0])?,
            parse(fields[1])?,
            parse(fields[2])?,
        ));
        let label = matches!(fields[3].trim(), "True" | "true" | "1" | "1.0");
        labels.push(label);
    }

    Ok((points, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join("anomaly-data-generator-tests");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn labels_colour_the_cloud_red_and_blue() {
        let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let cloud = PointCloud::with_labels(points, &[true, false]);

        let colours = cloud.colours.unwrap();
        assert_eq!(colours[0], [1.0, 0.0, 0.0]);
        assert_eq!(colours[1], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn identical_clouds_have_zero_distance() {
        let points: Vec<Point3<f64>> = (0..50)
            .map(|i| Point3::new(i as f64 * 0.1, (i % 7) as f64, 0.0))
            .collect();
        let a = PointCloud::new(points.clone());
        let b = PointCloud::new(points);

        let distances = a.nearest_distances(&b);
        assert_eq!(distances.len(), a.len());
        for d in distances {
            assert!(d.abs() < 1e-12);
        }
    }

    #[test]
    fn distances_are_nonnegative_and_ordered() {
        let candidate = PointCloud::new(vec![
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(0.0, 0.0, 0.5),
        ]);
        let reference = PointCloud::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ]);

        let distances = candidate.nearest_distances(&reference);
        assert!((distances[0] - 2.0).abs() < 1e-12);
        assert!((distances[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn las_round_trip_preserves_points_and_colours() {
        let points = vec![
            Point3::new(0.125, -0.5, 0.75),
            Point3::new(1.0, 2.0, -3.0),
        ];
        let cloud = PointCloud::with_labels(points.clone(), &[true, false]);
        let path = temp_dir().join("round_trip.las");

        cloud.write_las(&path).unwrap();
        let restored = PointCloud::read_las(&path).unwrap();

        assert_eq!(restored.len(), 2);
        for (a, b) in points.iter().zip(&restored.points) {
            assert!((a - b).norm() < 1e-5);
        }
        let colours = restored.colours.unwrap();
        assert!(colours[0][0] > 0.99 && colours[0][2] < 0.01);
        assert!(colours[1][2] > 0.99 && colours[1][0] < 0.01);
    }

    #[test]
    fn labeled_csv_round_trip() {
        let points = vec![Point3::new(0.1, 0.2, 0.3), Point3::new(-1.0, 0.0, 2.5)];
        let labels = vec![true, false];
        let path = temp_dir().join("labeled.csv");

        write_labeled_csv(&path, &points, &labels).unwrap();
        let (restored_points, restored_labels) = read_labeled_csv(&path).unwrap();

        assert_eq!(restored_labels, labels);
        for (a, b) in points.iter().zip(&restored_points) {
            assert!((a - b).norm() < 1e-12);
        }
    }
}
