/// Seed selection and Gaussian influence field computation.
use crate::error::PipelineError;
use crate::mesh::Mesh;
use constants::sampling::{XY_MATCH_REL_TOL, Z_TIE_REL_TOL, is_close_rel};
use rand::Rng;
use rand::rngs::StdRng;

/// Pick the anomaly seed vertex: a random vertex fixes an X-Y column,
/// then the highest vertex within that column wins.
///
/// Exact-z ties are broken by an independent coin flip per tied vertex,
/// so the winner depends on vertex iteration order. The crate iterates
/// vertices in index order and draws from the caller's seeded generator,
/// which keeps runs reproducible for a given seed; use the lowest index
/// instead if order-independent tie-breaking is ever needed.
pub fn find_highest_vertex_on_xy_plane(
    mesh: &Mesh,
    rng: &mut StdRng,
) -> Result<u32, PipelineError> {
    if mesh.vertices.is_empty() {
        return Err(PipelineError::EmptyMesh(mesh.name.clone()));
    }

    let rdm = &mesh.vertices[rng.random_range(0..mesh.vertices.len())];
    let point = (rdm.x, rdm.y);

    let mut highest_vertex: Option<u32> = None;
    let mut highest_z = f64::NEG_INFINITY;

    for (index, vertex) in mesh.vertices.iter().enumerate() {
        if is_close_rel(vertex.z, highest_z, Z_TIE_REL_TOL) {
            // Same height as the current winner: replace it half the time.
            if rng.random::<f64>() < 0.5 {
                highest_vertex = Some(index as u32);
            }
        } else if vertex.z > highest_z
            && is_close_rel(vertex.x, point.0, XY_MATCH_REL_TOL)
            && is_close_rel(vertex.y, point.1, XY_MATCH_REL_TOL)
        {
            highest_vertex = Some(index as u32);
            highest_z = vertex.z;
        }
    }

    // The randomly chosen vertex always matches its own column, so a
    // non-empty mesh always yields a winner.
    highest_vertex.ok_or_else(|| PipelineError::EmptyMesh(mesh.name.clone()))
}

/// Gaussian influence field around a seed vertex.
///
/// Every vertex within `influence_radius` of the seed is returned with
/// weight `exp(-d^2 / (2 sigma^2))`. The radius is a hard cutoff: a
/// vertex outside it is excluded however large its formula value is.
pub fn find_nearby_vertices_influence(
    mesh: &Mesh,
    seed_vertex: u32,
    influence_radius: f64,
    sigma: f64,
) -> Vec<(u32, f64)> {
    let seed = mesh.vertices[seed_vertex as usize];
    let mut selected = Vec::new();

    for (index, vertex) in mesh.vertices.iter().enumerate() {
        let distance = (vertex - seed).norm();
        let influence = (-distance.powi(2) / (2.0 * sigma.powi(2))).exp();
        if distance <= influence_radius {
            selected.push((index as u32, influence));
        }
    }

    selected
}
