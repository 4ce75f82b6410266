/// Ray-mesh intersection queries shared by the visibility culler and
/// the image renderer.
use crate::mesh::Mesh;
use nalgebra::{Point3, Vector3};

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Vector3<f64>,
}

impl Ray {
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn point_at(&self, t: f64) -> Point3<f64> {
        Point3::from(self.origin.coords + self.direction * t)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub distance: f64,
    pub point: Point3<f64>,
    pub normal: Vector3<f64>,
    /// Owning polygon of the struck triangle
    pub polygon_index: u32,
}

struct PackedTriangle {
    a: Point3<f64>,
    b: Point3<f64>,
    c: Point3<f64>,
    polygon_index: u32,
}

/// Immutable triangle soup built once per mesh and cast against many
/// times. Carries the mesh bounding box for a slab-test early out; the
/// hit-set semantics are identical to casting against the raw face list.
pub struct MeshRaycaster {
    triangles: Vec<PackedTriangle>,
    aabb_min: Point3<f64>,
    aabb_max: Point3<f64>,
}

impl MeshRaycaster {
    pub fn new(mesh: &Mesh) -> Self {
        let triangles = mesh
            .triangulate()
            .iter()
            .map(|tri| PackedTriangle {
                a: mesh.vertices[tri.vertices[0] as usize],
                b: mesh.vertices[tri.vertices[1] as usize],
                c: mesh.vertices[tri.vertices[2] as usize],
                polygon_index: tri.polygon_index,
            })
            .collect();
        let (aabb_min, aabb_max) = mesh.bounds();

        Self {
            triangles,
            aabb_min,
            aabb_max,
        }
    }

    /// Cast a ray and return the nearest hit, if any.
    pub fn cast(&self, ray: &Ray) -> Option<RayHit> {
        if ray_aabb_hit_t(ray, self.aabb_min, self.aabb_max).is_none() {
            return None;
        }

        let mut closest: Option<RayHit> = None;
        let mut closest_dist = f64::MAX;

        for tri in &self.triangles {
            if let Some((t, normal)) = ray_triangle_intersection(ray, tri.a, tri.b, tri.c) {
                if t < closest_dist {
                    closest_dist = t;
                    closest = Some(RayHit {
                        distance: t,
                        point: ray.point_at(t),
                        normal,
                        polygon_index: tri.polygon_index,
                    });
                }
            }
        }

        closest
    }
}

/// Moller-Trumbore ray-triangle intersection. Returns the hit distance
/// and the triangle's geometric normal.
fn ray_triangle_intersection(
    ray: &Ray,
    v0: Point3<f64>,
    v1: Point3<f64>,
    v2: Point3<f64>,
) -> Option<(f64, Vector3<f64>)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray.direction.cross(&edge2);
    let a = edge1.dot(&h);

    if a.abs() < EPSILON {
        return None; // Ray parallel to triangle
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * ray.direction.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);
    if t > EPSILON {
        Some((t, edge1.cross(&edge2).normalize()))
    } else {
        None
    }
}

// Slab-method ray-AABB intersection, returns Some(t) or None
fn ray_aabb_hit_t(ray: &Ray, min: Point3<f64>, max: Point3<f64>) -> Option<f64> {
    let inv = Vector3::new(
        if ray.direction.x != 0.0 {
            1.0 / ray.direction.x
        } else {
            f64::INFINITY
        },
        if ray.direction.y != 0.0 {
            1.0 / ray.direction.y
        } else {
            f64::INFINITY
        },
        if ray.direction.z != 0.0 {
            1.0 / ray.direction.z
        } else {
            f64::INFINITY
        },
    );

    let (mut tmin, mut tmax) = (
        (min.x - ray.origin.x) * inv.x,
        (max.x - ray.origin.x) * inv.x,
    );
    if tmin > tmax {
        std::mem::swap(&mut tmin, &mut tmax);
    }

    let (mut tymin, mut tymax) = (
        (min.y - ray.origin.y) * inv.y,
        (max.y - ray.origin.y) * inv.y,
    );
    if tymin > tymax {
        std::mem::swap(&mut tymin, &mut tymax);
    }

    if tmin > tymax || tymin > tmax {
        return None;
    }
    tmin = tmin.max(tymin);
    tmax = tmax.min(tymax);

    let (mut tzmin, mut tzmax) = (
        (min.z - ray.origin.z) * inv.z,
        (max.z - ray.origin.z) * inv.z,
    );
    if tzmin > tzmax {
        std::mem::swap(&mut tzmin, &mut tzmax);
    }

    if tmin > tzmax || tzmin > tmax {
        return None;
    }
    tmin = tmin.max(tzmin);
    tmax = tmax.min(tzmax);

    if tmax < 0.0 {
        return None;
    }
    Some(if tmin >= 0.0 { tmin } else { tmax })
}
