/// Camera objects and the view-frustum pixel grid they project.
use crate::mesh::Mesh;
use constants::render_settings::{DEFAULT_FOCAL_LENGTH, DEFAULT_SENSOR_WIDTH, RenderSettings};
use nalgebra::{Point3, Rotation3, Vector3};

/// Perspective camera with position and orientation in world space.
/// The camera looks down its local -Z axis, local +Y is up.
#[derive(Debug, Clone)]
pub struct Camera {
    pub name: String,
    pub position: Point3<f64>,
    pub rotation: Rotation3<f64>,
    /// Focal length in millimetres
    pub focal_length: f64,
    /// Sensor width in millimetres
    pub sensor_width: f64,
}

/// View-frustum corners on the plane one unit in front of the camera,
/// in camera-local coordinates.
#[derive(Debug, Clone, Copy)]
pub struct ViewFrame {
    pub top_right: Vector3<f64>,
    pub bottom_right: Vector3<f64>,
    pub bottom_left: Vector3<f64>,
    pub top_left: Vector3<f64>,
}

impl Camera {
    /// Compute the view-frame corners for the configured resolution.
    /// The sensor fits the larger pixel dimension; the other axis is
    /// scaled by the aspect ratio.
    pub fn view_frame(&self, settings: &RenderSettings) -> ViewFrame {
        let (res_x, res_y) = settings.effective_resolution();
        let fit = self.sensor_width / (2.0 * self.focal_length);

        let (half_w, half_h) = if res_x >= res_y {
            (fit, fit * res_y as f64 / res_x as f64)
        } else {
            (fit * res_x as f64 / res_y as f64, fit)
        };

        ViewFrame {
            top_right: Vector3::new(half_w, half_h, -1.0),
            bottom_right: Vector3::new(half_w, -half_h, -1.0),
            bottom_left: Vector3::new(-half_w, -half_h, -1.0),
            top_left: Vector3::new(-half_w, half_h, -1.0),
        }
    }

    /// World-space ray direction through a pixel-plane point given in
    /// camera-local coordinates.
    pub fn pixel_direction(&self, pixel: Vector3<f64>) -> Vector3<f64> {
        let rotated = self.rotation * pixel;
        let destination = rotated + self.position.coords;
        (destination - self.position.coords).normalize()
    }
}

/// Evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, num: usize) -> Vec<f64> {
    if num == 0 {
        return Vec::new();
    }
    if num == 1 {
        return vec![start];
    }
    let step = (end - start) / (num - 1) as f64;
    (0..num).map(|i| start + step * i as f64).collect()
}

/// Create a circle of cameras around an object.
///
/// Cameras sit at `radius` from the object location, `height` above it,
/// and are aimed at the object's bounding-box centre scaled by the size
/// normalisation factor.
pub fn create_cameras_around_object(
    mesh: &Mesh,
    radius: f64,
    height: f64,
    num_cams: usize,
    normalization: f64,
) -> Vec<Camera> {
    let mut cameras = Vec::with_capacity(num_cams);

    let obj_center = mesh.bounding_box_center();
    let max_dim = mesh.max_dimension();
    let norm_factor = if max_dim > 0.0 {
        normalization / max_dim
    } else {
        1.0
    };

    for i in 0..num_cams {
        let angle = i as f64 * 2.0 * std::f64::consts::PI / num_cams as f64;
        let position = Point3::new(radius * angle.cos(), radius * angle.sin(), height);

        // Aim local -Z at the (normalised) object centre, local +Y as
        // close to world up as the view direction allows.
        let direction = position.coords - obj_center.coords * norm_factor;
        let rotation = Rotation3::face_towards(&direction, &Vector3::z());

        cameras.push(Camera {
            name: format!("Camera{i}"),
            position,
            rotation,
            focal_length: DEFAULT_FOCAL_LENGTH,
            sensor_width: DEFAULT_SENSOR_WIDTH,
        });
    }

    cameras
}
