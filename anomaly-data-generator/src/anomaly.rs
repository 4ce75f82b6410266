/// Anomaly displacement engine: pushes or pulls a Gaussian-weighted
/// neighbourhood of the seed vertex along the up axis and records the
/// per-vertex anomaly strength.
use crate::error::PipelineError;
use crate::influence::{find_highest_vertex_on_xy_plane, find_nearby_vertices_influence};
use crate::mesh::Mesh;
use constants::coordinate_system::UP_AXIS;
use constants::labels::BACKGROUND_COLOUR;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use std::collections::{HashMap, HashSet};

/// Anomaly shape parameters for one injection.
#[derive(Debug, Clone, Copy)]
pub struct AnomalyParams {
    pub sigma: f64,
    pub strength: f64,
    pub influence_radius: f64,
    /// +1.0 pulls the surface outward along the up axis, -1.0 pushes in
    pub direction_sign: f64,
}

/// Displace the influence neighbourhood of a randomly seeded surface
/// vertex and paint the strength gradient into the vertex colour layer.
///
/// Returns the set of displaced vertex indices; downstream labeling
/// derives the anomaly face set from it. An influence field that comes
/// back empty is treated as a no-op anomaly and yields an empty set
/// instead of faulting in the strength normalisation.
pub fn apply_anomaly(
    mesh: &mut Mesh,
    params: &AnomalyParams,
    rng: &mut StdRng,
) -> Result<HashSet<u32>, PipelineError> {
    if mesh.vertices.is_empty() {
        return Err(PipelineError::EmptyMesh(mesh.name.clone()));
    }

    let center_vertex = find_highest_vertex_on_xy_plane(mesh, rng)?;
    let nearby_vertices =
        find_nearby_vertices_influence(mesh, center_vertex, params.influence_radius, params.sigma);

    if nearby_vertices.is_empty() {
        return Ok(HashSet::new());
    }

    // Displacement direction: the up axis with its z component scaled
    // by |z| times the direction sign. A unit axis collapses to +-1.
    let mut normal = Vector3::new(UP_AXIS[0], UP_AXIS[1], UP_AXIS[2]);
    normal.z *= normal.z.abs() * params.direction_sign;

    let mut strengths: HashMap<u32, f64> = HashMap::new();
    for &(vertex, influence) in &nearby_vertices {
        let direction = normal * params.strength * influence;
        mesh.vertices[vertex as usize] += direction;
        strengths.insert(vertex, (params.strength * influence).abs());
    }

    let max_strength = strengths.values().cloned().fold(0.0f64, f64::max);

    let selected_vertices: HashSet<u32> = nearby_vertices.iter().map(|&(v, _)| v).collect();
    paint_strength_gradient(mesh, &selected_vertices, &strengths, max_strength);

    // Vertices moved, the cached triangulation is stale.
    mesh.calc_loop_triangles();

    Ok(selected_vertices)
}

/// Vertex colour channel proportional to normalised anomaly strength:
/// red at the peak fading to blue, plain blue on untouched faces.
/// Visualisation only; labels derive from the returned vertex set.
fn paint_strength_gradient(
    mesh: &mut Mesh,
    selected: &HashSet<u32>,
    strengths: &HashMap<u32, f64>,
    max_strength: f64,
) {
    let colours = mesh.ensure_vertex_colours();
    for (index, colour) in colours.iter_mut().enumerate() {
        let index = index as u32;
        if selected.contains(&index) {
            let s = if max_strength > 0.0 {
                strengths.get(&index).copied().unwrap_or(0.0) / max_strength
            } else {
                0.0
            };
            *colour = [s, 0.0, 1.0 - s, 1.0];
        } else {
            *colour = BACKGROUND_COLOUR;
        }
    }
}
