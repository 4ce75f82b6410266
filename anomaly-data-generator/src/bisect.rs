/// Horizontal mesh bisection: plane cuts at evenly spaced heights
/// produce reduced-height variants of the reference object.
use crate::error::PipelineError;
use crate::cameras::linspace;
use crate::mesh::{self, Mesh};
use crate::scene::Scene;
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Generate bisects of the given object and save them as STL files.
///
/// Cut planes sit at `linspace(0, floor(height), num_of_bisect)`; the
/// zero plane is skipped. Geometry above each plane is discarded
/// (`clear_outer`), the cut is capped with a fan so the variant stays
/// closed. The mesh is reloaded from disk for every cut, so cuts never
/// compound.
pub fn bisect_function(
    input_path: &Path,
    output_dir: &Path,
    num_of_bisect: usize,
    scene: &mut Scene,
) -> Result<Vec<PathBuf>, PipelineError> {
    scene.clear();
    let height = scene.load_mesh_from_stl(input_path)?.dimensions().z;

    let stem = input_path
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let mut files_location = Vec::new();
    for (suffix, plane_z) in linspace(0.0, height.floor(), num_of_bisect)
        .into_iter()
        .enumerate()
    {
        if plane_z == 0.0 {
            continue;
        }

        scene.clear();
        let loaded = scene.load_mesh_from_stl(input_path)?;
        let clipped = clip_below_z(loaded, plane_z, true);

        let file_path = output_dir.join(format!("{stem}_bisect_{suffix}.stl"));
        mesh::write_stl(&clipped, &file_path)?;
        files_location.push(file_path);
    }

    Ok(files_location)
}

/// Clip a mesh against the horizontal plane `z = plane_z`, keeping the
/// geometry below. Crossing triangles are split along the plane; with
/// `fill` the cut cross-section is capped by a centroid fan with the
/// cap normal pointing up.
pub fn clip_below_z(source: &Mesh, plane_z: f64, fill: bool) -> Mesh {
    let mut builder = ClippedMeshBuilder::new(&source.name);
    let mut chords: Vec<(Point3<f64>, Point3<f64>)> = Vec::new();

    for tri in source.triangulate() {
        let corners = [
            source.vertices[tri.vertices[0] as usize],
            source.vertices[tri.vertices[1] as usize],
            source.vertices[tri.vertices[2] as usize],
        ];
        let below = [
            corners[0].z <= plane_z,
            corners[1].z <= plane_z,
            corners[2].z <= plane_z,
        ];

        match below.iter().filter(|&&b| b).count() {
            3 => builder.push_triangle(corners[0], corners[1], corners[2]),
            0 => {}
            kept => {
                // rotate so the pattern is [kept..., cut...]
                let shift = rotation_for(below, kept);
                let a = corners[shift];
                let b = corners[(shift + 1) % 3];
                let c = corners[(shift + 2) % 3];

                if kept == 1 {
                    // a survives; clip edges a-b and a-c
                    let iab = plane_intersection(a, b, plane_z);
                    let iac = plane_intersection(a, c, plane_z);
                    builder.push_triangle(a, iab, iac);
                    chords.push((iab, iac));
                } else {
                    // a and b survive; clip edges b-c and c-a
                    let ibc = plane_intersection(b, c, plane_z);
                    let ica = plane_intersection(c, a, plane_z);
                    builder.push_triangle(a, b, ibc);
                    builder.push_triangle(a, ibc, ica);
                    chords.push((ibc, ica));
                }
            }
        }
    }

    if fill && !chords.is_empty() {
        fill_cap(&mut builder, &chords);
    }

    builder.finish()
}

/// Cap the cut cross-section with triangles fanned from the chord
/// centroid, oriented so the cap normal points along +z.
fn fill_cap(builder: &mut ClippedMeshBuilder, chords: &[(Point3<f64>, Point3<f64>)]) {
    let mut centroid = Vector3::zeros();
    for (p, q) in chords {
        centroid += p.coords + q.coords;
    }
    let centroid = Point3::from(centroid / (chords.len() * 2) as f64);

    for &(p, q) in chords {
        if (p - q).norm() == 0.0 {
            continue;
        }
        let upward = (p - centroid).cross(&(q - centroid)).z >= 0.0;
        if upward {
            builder.push_triangle(centroid, p, q);
        } else {
            builder.push_triangle(centroid, q, p);
        }
    }
}

fn rotation_for(below: [bool; 3], kept: usize) -> usize {
    for shift in 0..3 {
        let pattern = [below[shift], below[(shift + 1) % 3], below[(shift + 2) % 3]];
        let matches = if kept == 1 {
            pattern == [true, false, false]
        } else {
            pattern == [true, true, false]
        };
        if matches {
            return shift;
        }
    }
    0
}

fn plane_intersection(a: Point3<f64>, b: Point3<f64>, plane_z: f64) -> Point3<f64> {
    let t = (plane_z - a.z) / (b.z - a.z);
    Point3::from(a.coords + (b.coords - a.coords) * t)
}

/// Accumulates clipped triangles, welding duplicated corners back into
/// an indexed mesh.
struct ClippedMeshBuilder {
    mesh: Mesh,
    welded: HashMap<[u64; 3], u32>,
}

impl ClippedMeshBuilder {
    fn new(name: &str) -> Self {
        Self {
            mesh: Mesh::new(name),
            welded: HashMap::new(),
        }
    }

    fn push_triangle(&mut self, a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) {
        let ia = self.vertex_index(a);
        let ib = self.vertex_index(b);
        let ic = self.vertex_index(c);
        self.mesh.polygons.push(vec![ia, ib, ic]);
    }

    fn vertex_index(&mut self, p: Point3<f64>) -> u32 {
        let key = [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()];
        let next = self.mesh.vertices.len() as u32;
        *self.welded.entry(key).or_insert_with(|| {
            self.mesh.vertices.push(p);
            next
        })
    }

    fn finish(self) -> Mesh {
        self.mesh
    }
}
