/// Indexed surface mesh with derived loop triangulation and STL I/O.
use crate::error::PipelineError;
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Triangle derived from the polygon table. Each triangle remembers the
/// polygon it was fanned out of so face-level labels survive triangulation.
#[derive(Debug, Clone, Copy)]
pub struct LoopTriangle {
    pub vertices: [u32; 3],
    pub polygon_index: u32,
    pub area: f64,
}

/// Mutable surface mesh: ordered vertices, ordered polygons, cached
/// triangulation. The triangulation is re-derived on every
/// `calc_loop_triangles` call, so callers that mutate vertex positions
/// must call it again before sampling.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Point3<f64>>,
    pub polygons: Vec<Vec<u32>>,
    pub vertex_colours: Option<Vec<[f64; 4]>>,
    loop_triangles: Vec<LoopTriangle>,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vertices: Vec::new(),
            polygons: Vec::new(),
            vertex_colours: None,
            loop_triangles: Vec::new(),
        }
    }

    pub fn from_parts(name: &str, vertices: Vec<Point3<f64>>, polygons: Vec<Vec<u32>>) -> Self {
        Self {
            name: name.to_string(),
            vertices,
            polygons,
            vertex_colours: None,
            loop_triangles: Vec::new(),
        }
    }

    /// Axis-aligned cube primitive centred at the origin, built from six
    /// quad polygons with outward winding.
    pub fn primitive_cube(name: &str, size: f64) -> Self {
        let h = size / 2.0;
        let vertices = vec![
            Point3::new(-h, -h, -h),
            Point3::new(h, -h, -h),
            Point3::new(h, h, -h),
            Point3::new(-h, h, -h),
            Point3::new(-h, -h, h),
            Point3::new(h, -h, h),
            Point3::new(h, h, h),
            Point3::new(-h, h, h),
        ];
        let polygons = vec![
            vec![0, 3, 2, 1], // bottom
            vec![4, 5, 6, 7], // top
            vec![0, 1, 5, 4],
            vec![1, 2, 6, 5],
            vec![2, 3, 7, 6],
            vec![3, 0, 4, 7],
        ];
        Self::from_parts(name, vertices, polygons)
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_polygons(&self) -> usize {
        self.polygons.len()
    }

    /// Calculate mesh bounds. Empty meshes collapse to the origin.
    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        if self.vertices.is_empty() {
            return (Point3::origin(), Point3::origin());
        }

        let mut min = self.vertices[0];
        let mut max = self.vertices[0];
        for v in &self.vertices {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            min.z = min.z.min(v.z);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
            max.z = max.z.max(v.z);
        }

        (min, max)
    }

    /// Bounding box centre, matching the scene host's object-centre rule.
    pub fn bounding_box_center(&self) -> Point3<f64> {
        let (min, max) = self.bounds();
        Point3::from((min.coords + max.coords) * 0.5)
    }

    /// World space dimensions of the bounding box
    pub fn dimensions(&self) -> Vector3<f64> {
        let (min, max) = self.bounds();
        max - min
    }

    pub fn max_dimension(&self) -> f64 {
        let d = self.dimensions();
        d.x.max(d.y).max(d.z)
    }

    /// Translate every vertex so the bounding box centre sits at the
    /// origin. Equivalent to setting the object origin to the geometry
    /// centre and clearing its location.
    pub fn center_at_origin(&mut self) {
        let center = self.bounding_box_center();
        for v in &mut self.vertices {
            v.coords -= center.coords;
        }
    }

    /// Scale the mesh about the origin so its largest dimension equals
    /// `size`. Returns the previous largest dimension.
    pub fn normalize_size(&mut self, size: f64) -> f64 {
        let scale_back = self.max_dimension();
        if scale_back > 0.0 {
            let factor = size / scale_back;
            for v in &mut self.vertices {
                v.coords *= factor;
            }
        }
        scale_back
    }

    /// Total triangulated surface area
    pub fn surface_area(&self) -> f64 {
        self.triangulate().iter().map(|t| t.area).sum()
    }

    /// Fan-triangulate the polygon table without touching the cache.
    pub fn triangulate(&self) -> Vec<LoopTriangle> {
        let mut triangles = Vec::new();
        for (poly_idx, poly) in self.polygons.iter().enumerate() {
            if poly.len() < 3 {
                continue;
            }
            for i in 1..poly.len() - 1 {
                let ids = [poly[0], poly[i], poly[i + 1]];
                let a = self.vertices[ids[0] as usize];
                let b = self.vertices[ids[1] as usize];
                let c = self.vertices[ids[2] as usize];
                let area = (b - a).cross(&(c - a)).norm() * 0.5;
                triangles.push(LoopTriangle {
                    vertices: ids,
                    polygon_index: poly_idx as u32,
                    area,
                });
            }
        }
        triangles
    }

    /// Re-derive and cache the loop triangulation. Must be called after
    /// any vertex mutation and before sampling.
    pub fn calc_loop_triangles(&mut self) -> &[LoopTriangle] {
        self.loop_triangles = self.triangulate();
        &self.loop_triangles
    }

    /// Create the vertex colour layer if missing and return it.
    pub fn ensure_vertex_colours(&mut self) -> &mut Vec<[f64; 4]> {
        let num_vertices = self.vertices.len();
        self.vertex_colours
            .get_or_insert_with(|| vec![[1.0, 1.0, 1.0, 1.0]; num_vertices])
    }

    /// Delete every polygon whose index is not in `keep`, then drop the
    /// vertices no surviving polygon references. Polygon indices in
    /// `keep` refer to the face table as it is at call time; callers
    /// must not reindex between hit collection and deletion.
    pub fn delete_polygons_not_in(&mut self, keep: &std::collections::HashSet<u32>) {
        let mut retained: Vec<Vec<u32>> = Vec::with_capacity(keep.len());
        for (idx, poly) in self.polygons.iter().enumerate() {
            if keep.contains(&(idx as u32)) {
                retained.push(poly.clone());
            }
        }

        // Compact the vertex table and remap indices.
        let mut remap: HashMap<u32, u32> = HashMap::new();
        let mut vertices = Vec::new();
        for poly in &mut retained {
            for v in poly.iter_mut() {
                let old = *v as usize;
                let next = vertices.len() as u32;
                let mapped = *remap.entry(*v).or_insert_with(|| {
                    vertices.push(self.vertices[old]);
                    next
                });
                *v = mapped;
            }
        }

        self.vertices = vertices;
        self.polygons = retained;
        self.vertex_colours = None;
        self.loop_triangles.clear();
    }
}

/// Read a triangulated surface mesh from an STL file. Both binary and
/// ASCII layouts are accepted; duplicated corner vertices are welded by
/// exact coordinate match, as the scene host importer does.
pub fn read_stl(path: &Path) -> Result<Mesh, PipelineError> {
    let bytes = fs::read(path)?;
    let name = path
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let triangles = if is_binary_stl(&bytes) {
        parse_binary_stl(path, &bytes)?
    } else {
        parse_ascii_stl(path, &bytes)?
    };

    let mut mesh = Mesh::new(&name);
    let mut welded: HashMap<[u64; 3], u32> = HashMap::new();
    for tri in triangles {
        let mut poly = Vec::with_capacity(3);
        for corner in tri {
            let key = [
                corner[0].to_bits(),
                corner[1].to_bits(),
                corner[2].to_bits(),
            ];
            let next = mesh.vertices.len() as u32;
            let idx = *welded.entry(key).or_insert_with(|| {
                mesh.vertices
                    .push(Point3::new(corner[0], corner[1], corner[2]));
                next
            });
            poly.push(idx);
        }
        mesh.polygons.push(poly);
    }

    Ok(mesh)
}

/// Export a mesh as binary STL, triangulating polygons on the way out.
pub fn write_stl(mesh: &Mesh, path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let triangles = mesh.triangulate();
    let mut out = Vec::with_capacity(84 + triangles.len() * 50);

    let mut header = [0u8; 80];
    let tag = b"anomaly-data-generator binary STL";
    header[..tag.len()].copy_from_slice(tag);
    out.extend_from_slice(&header);
    out.extend_from_slice(&(triangles.len() as u32).to_le_bytes());

    for tri in &triangles {
        let a = mesh.vertices[tri.vertices[0] as usize];
        let b = mesh.vertices[tri.vertices[1] as usize];
        let c = mesh.vertices[tri.vertices[2] as usize];
        let normal = (b - a).cross(&(c - a));
        let normal = if normal.norm() > 0.0 {
            normal.normalize()
        } else {
            Vector3::zeros()
        };

        for component in [normal.x, normal.y, normal.z] {
            out.extend_from_slice(&(component as f32).to_le_bytes());
        }
        for point in [a, b, c] {
            for component in [point.x, point.y, point.z] {
                out.extend_from_slice(&(component as f32).to_le_bytes());
            }
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }

    let mut file = fs::File::create(path)?;
    file.write_all(&out)?;
    Ok(())
}

fn is_binary_stl(bytes: &[u8]) -> bool {
    if bytes.len() < 84 {
        return false;
    }
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    if bytes.len() == 84 + count * 50 {
        return true;
    }
    // binary files may carry trailing padding; only a leading `solid`
    // with a size mismatch indicates ASCII
    !bytes.starts_with(b"solid")
}

fn parse_binary_stl(path: &Path, bytes: &[u8]) -> Result<Vec<[[f64; 3]; 3]>, PipelineError> {
    if bytes.len() < 84 {
        return Err(PipelineError::Stl {
            path: path.to_path_buf(),
            reason: "file shorter than binary STL header".to_string(),
        });
    }

    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    let mut triangles = Vec::with_capacity(count);
    let mut offset = 84;
    for _ in 0..count {
        if offset + 50 > bytes.len() {
            return Err(PipelineError::Stl {
                path: path.to_path_buf(),
                reason: "truncated triangle record".to_string(),
            });
        }
        // Skip the stored normal, it is re-derived from the winding.
        let mut corners = [[0.0f64; 3]; 3];
        for (c, corner) in corners.iter_mut().enumerate() {
            for (axis, value) in corner.iter_mut().enumerate() {
                let at = offset + 12 + c * 12 + axis * 4;
                *value =
                    f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
                        as f64;
            }
        }
        triangles.push(corners);
        offset += 50;
    }

    Ok(triangles)
}

fn parse_ascii_stl(path: &Path, bytes: &[u8]) -> Result<Vec<[[f64; 3]; 3]>, PipelineError> {
    let text = String::from_utf8_lossy(bytes);
    let mut triangles = Vec::new();
    let mut current: Vec<[f64; 3]> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("vertex") {
            let mut parts = rest.split_whitespace();
            let mut corner = [0.0f64; 3];
            for value in corner.iter_mut() {
                *value = parts
                    .next()
                    .and_then(|p| p.parse::<f64>().ok())
                    .ok_or_else(|| PipelineError::Stl {
                        path: path.to_path_buf(),
                        reason: format!("unparseable vertex line: `{line}`"),
                    })?;
            }
            current.push(corner);
            if current.len() == 3 {
                triangles.push([current[0], current[1], current[2]]);
                current.clear();
            }
        }
    }

    if triangles.is_empty() {
        return Err(PipelineError::Stl {
            path: path.to_path_buf(),
            reason: "no triangles found".to_string(),
        });
    }

    Ok(triangles)
}
