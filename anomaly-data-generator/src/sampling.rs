/// Area-weighted point sampling over the mesh surface, stratified into
/// an anomaly-region pool and a normal-region pool.
use crate::error::PipelineError;
use crate::mesh::{LoopTriangle, Mesh};
use constants::sampling::MIN_ANOMALY_SAMPLES;
use nalgebra::Point3;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use std::collections::HashSet;

/// Sample `sample_size` surface points with boolean anomaly labels.
///
/// A face belongs to the anomaly region when any of its vertices is in
/// `anomaly_vertices`. The anomaly quota is
/// `max(10, floor(sample_size * |anomaly| / |normal|))`; the divisor is
/// deliberately the normal-triangle count, which over-samples small
/// anomaly regions relative to their naive area fraction. Triangles are
/// drawn with replacement, weighted by area, and each drawn triangle
/// contributes `points_per_triangle` uniform barycentric points. Output
/// order is normal points first, then anomaly points.
pub fn mesh_to_point_clouds(
    mesh: &mut Mesh,
    sample_size: usize,
    anomaly_vertices: &HashSet<u32>,
    points_per_triangle: usize,
    rng: &mut StdRng,
) -> Result<(Vec<Point3<f64>>, Vec<bool>), PipelineError> {
    let mut anomaly_polygons: HashSet<u32> = HashSet::new();
    if !anomaly_vertices.is_empty() {
        for (index, polygon) in mesh.polygons.iter().enumerate() {
            if polygon.iter().any(|v| anomaly_vertices.contains(v)) {
                anomaly_polygons.insert(index as u32);
            }
        }
    }

    let triangles = mesh.calc_loop_triangles().to_vec();
    let (anomaly_triangles, normal_triangles): (Vec<LoopTriangle>, Vec<LoopTriangle>) = triangles
        .into_iter()
        .partition(|t| anomaly_polygons.contains(&t.polygon_index));

    if normal_triangles.is_empty() && anomaly_triangles.is_empty() {
        return Err(PipelineError::NoTriangles(mesh.name.clone()));
    }

    let anomaly_sample_size = if anomaly_vertices.is_empty() {
        0
    } else if normal_triangles.is_empty() {
        // Fully anomalous mesh: the quota ratio would divide by zero,
        // so every sample comes from the anomaly pool.
        sample_size
    } else {
        let ratio = sample_size * anomaly_triangles.len() / normal_triangles.len();
        MIN_ANOMALY_SAMPLES.max(ratio).min(sample_size)
    };
    let normal_sample_size = sample_size - anomaly_sample_size;

    let mut points =
        draw_surface_points(mesh, &normal_triangles, normal_sample_size, points_per_triangle, rng)?;
    let mut labels = vec![false; normal_sample_size * points_per_triangle];

    if anomaly_sample_size > 0 {
        points.extend(draw_surface_points(
            mesh,
            &anomaly_triangles,
            anomaly_sample_size,
            points_per_triangle,
            rng,
        )?);
        labels.extend(vec![true; anomaly_sample_size * points_per_triangle]);
    }

    Ok((points, labels))
}

/// Draw `count` triangles with replacement, weighted by area, and place
/// `points_per_triangle` uniform random points on each.
fn draw_surface_points(
    mesh: &Mesh,
    triangles: &[LoopTriangle],
    count: usize,
    points_per_triangle: usize,
    rng: &mut StdRng,
) -> Result<Vec<Point3<f64>>, PipelineError> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let weights: Vec<f64> = triangles.iter().map(|t| t.area).collect();
    let chooser = WeightedIndex::new(&weights)
        .map_err(|_| PipelineError::DegenerateSurface(mesh.name.clone()))?;

    let mut points = Vec::with_capacity(count * points_per_triangle);
    for _ in 0..count {
        let tri = &triangles[chooser.sample(rng)];
        let a = mesh.vertices[tri.vertices[0] as usize];
        let b = mesh.vertices[tri.vertices[1] as usize];
        let c = mesh.vertices[tri.vertices[2] as usize];

        for _ in 0..points_per_triangle {
            points.push(triangle_random_point(a, b, c, rng));
        }
    }

    Ok(points)
}

/// Uniform random point on a triangle via the square-root warp.
fn triangle_random_point(
    a: Point3<f64>,
    b: Point3<f64>,
    c: Point3<f64>,
    rng: &mut StdRng,
) -> Point3<f64> {
    let r1: f64 = rng.random();
    let r2: f64 = rng.random();
    let sqrt_r1 = r1.sqrt();

    let w_a = 1.0 - sqrt_r1;
    let w_b = sqrt_r1 * (1.0 - r2);
    let w_c = sqrt_r1 * r2;

    Point3::from(a.coords * w_a + b.coords * w_b + c.coords * w_c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn no_anomaly_yields_all_false_labels() {
        let mut mesh = Mesh::primitive_cube("cube", 2.0);
        let mut rng = StdRng::seed_from_u64(11);

        let (points, labels) =
            mesh_to_point_clouds(&mut mesh, 1000, &HashSet::new(), 1, &mut rng).unwrap();

        assert_eq!(points.len(), 1000);
        assert_eq!(labels.len(), 1000);
        assert!(labels.iter().all(|&l| !l));
    }

    #[test]
    fn label_counts_match_the_quota_exactly() {
        let mut mesh = Mesh::primitive_cube("cube", 2.0);
        let mut rng = StdRng::seed_from_u64(11);

        // displace vertex 6 only; faces 1, 3, 4 each touch it
        let anomaly: HashSet<u32> = [6u32].into_iter().collect();
        let sample_size = 1000;
        let (points, labels) =
            mesh_to_point_clouds(&mut mesh, sample_size, &anomaly, 1, &mut rng).unwrap();

        // 3 anomaly quads = 6 triangles, 3 normal quads = 6 triangles:
        // ratio quota = 1000 * 6 / 6 = 1000 capped at sample_size
        let true_count = labels.iter().filter(|&&l| l).count();
        assert_eq!(points.len(), labels.len());
        assert_eq!(points.len(), sample_size);
        assert_eq!(true_count, 1000);
    }

    #[test]
    fn small_anomaly_regions_get_the_minimum_quota() {
        // ten disjoint normal triangles plus one tiny anomaly triangle
        let mut vertices = Vec::new();
        let mut polygons = Vec::new();
        for i in 0..10 {
            let base = vertices.len() as u32;
            let x = i as f64 * 3.0;
            vertices.push(Point3::new(x, 0.0, 0.0));
            vertices.push(Point3::new(x + 1.0, 0.0, 0.0));
            vertices.push(Point3::new(x, 1.0, 0.0));
            polygons.push(vec![base, base + 1, base + 2]);
        }
        let base = vertices.len() as u32;
        vertices.push(Point3::new(-5.0, -5.0, 0.0));
        vertices.push(Point3::new(-4.9, -5.0, 0.0));
        vertices.push(Point3::new(-5.0, -4.9, 0.0));
        polygons.push(vec![base, base + 1, base + 2]);

        let mut mesh = Mesh::from_parts("plane", vertices, polygons);
        let mut rng = StdRng::seed_from_u64(13);
        let anomaly: HashSet<u32> = [base].into_iter().collect();

        let (points, labels) = mesh_to_point_clouds(&mut mesh, 50, &anomaly, 1, &mut rng).unwrap();
        let true_count = labels.iter().filter(|&&l| l).count();

        // floor(50 * 1 / 10) = 5, lifted to the minimum quota of 10
        assert_eq!(true_count, MIN_ANOMALY_SAMPLES);
        assert_eq!(points.len(), 50);
    }

    #[test]
    fn normal_points_precede_anomaly_points() {
        let mut mesh = Mesh::primitive_cube("cube", 2.0);
        let mut rng = StdRng::seed_from_u64(17);
        let anomaly: HashSet<u32> = [6u32].into_iter().collect();

        let (_, labels) = mesh_to_point_clouds(&mut mesh, 100, &anomaly, 2, &mut rng).unwrap();
        let first_true = labels.iter().position(|&l| l);
        if let Some(boundary) = first_true {
            assert!(labels[boundary..].iter().all(|&l| l));
        }
    }

    #[test]
    fn fully_anomalous_mesh_samples_only_anomalies() {
        let mut mesh = Mesh::primitive_cube("cube", 2.0);
        let mut rng = StdRng::seed_from_u64(19);
        let anomaly: HashSet<u32> = (0u32..8).collect();

        let (points, labels) = mesh_to_point_clouds(&mut mesh, 500, &anomaly, 1, &mut rng).unwrap();
        assert_eq!(points.len(), 500);
        assert!(labels.iter().all(|&l| l));
    }

    #[test]
    fn triangle_selection_tracks_area() {
        // two triangles: one 9x the area of the other, z encodes identity
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(0.0, 3.0, 0.0),
            Point3::new(10.0, 0.0, 5.0),
            Point3::new(11.0, 0.0, 5.0),
            Point3::new(10.0, 1.0, 5.0),
        ];
        let polygons = vec![vec![0, 1, 2], vec![3, 4, 5]];
        let mut mesh = Mesh::from_parts("two_tris", vertices, polygons);
        let mut rng = StdRng::seed_from_u64(23);

        let (points, _) =
            mesh_to_point_clouds(&mut mesh, 4000, &HashSet::new(), 1, &mut rng).unwrap();
        let big = points.iter().filter(|p| p.z < 2.5).count() as f64;
        let fraction = big / points.len() as f64;
        // expected 0.9, allow generous sampling noise
        assert!((fraction - 0.9).abs() < 0.05);
    }

    #[test]
    fn points_lie_on_the_surface() {
        let mut mesh = Mesh::primitive_cube("cube", 2.0);
        let mut rng = StdRng::seed_from_u64(29);

        let (points, _) =
            mesh_to_point_clouds(&mut mesh, 200, &HashSet::new(), 1, &mut rng).unwrap();
        for p in &points {
            let linf = p.x.abs().max(p.y.abs()).max(p.z.abs());
            assert!((linf - 1.0).abs() < 1e-9);
            assert!(p.x.abs() <= 1.0 + 1e-9 && p.y.abs() <= 1.0 + 1e-9 && p.z.abs() <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn empty_mesh_cannot_be_sampled() {
        let mut mesh = Mesh::new("empty");
        let mut rng = StdRng::seed_from_u64(31);
        assert!(matches!(
            mesh_to_point_clouds(&mut mesh, 10, &HashSet::new(), 1, &mut rng),
            Err(PipelineError::NoTriangles(_))
        ));
    }
}
