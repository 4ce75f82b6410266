/// Headless grayscale renders: one ray per pixel, lambert shading from
/// the active point lights. Stands in for the scene host's image
/// renderer; materials and shader graphs are out of scope.
use crate::cameras::{Camera, linspace};
use crate::error::PipelineError;
use crate::lights::PointLight;
use crate::mesh::Mesh;
use crate::ray::{MeshRaycaster, Ray};
use constants::render_settings::RenderSettings;
use image::GrayImage;
use nalgebra::Vector3;
use rayon::prelude::*;
use std::fs;
use std::path::Path;

const AMBIENT: f64 = 0.05;

/// Render the mesh from one camera into a grayscale PNG.
pub fn render_object(
    mesh: &Mesh,
    camera: &Camera,
    lights: &[PointLight],
    settings: &RenderSettings,
    file_path: &Path,
) -> Result<(), PipelineError> {
    let caster = MeshRaycaster::new(mesh);
    let (res_x, res_y) = settings.effective_resolution();

    let frame = camera.view_frame(settings);
    let x_range = linspace(frame.top_left.x, frame.top_right.x, res_x);
    let y_range = linspace(frame.top_left.y, frame.bottom_left.y, res_y);

    let rows: Vec<Vec<u8>> = y_range
        .par_iter()
        .map(|&y| {
            let mut row = Vec::with_capacity(res_x);
            for &x in &x_range {
                let pixel = Vector3::new(x, y, frame.top_left.z);
                let direction = camera.pixel_direction(pixel);
                let ray = Ray::new(camera.position, direction);

                let value = match caster.cast(&ray) {
                    Some(hit) => {
                        let mut intensity = AMBIENT;
                        for light in lights.iter().filter(|l| l.energy > 0.0) {
                            let to_light = light.position - hit.point;
                            let distance_sq = to_light.norm_squared().max(1e-12);
                            // flip the geometric normal toward the viewer
                            let mut normal = hit.normal;
                            if normal.dot(&ray.direction) > 0.0 {
                                normal = -normal;
                            }
                            let lambert = normal.dot(&to_light.normalize()).max(0.0);
                            intensity += light.energy * lambert
                                / (4.0 * std::f64::consts::PI * distance_sq);
                        }
                        (intensity.min(1.0) * 255.0) as u8
                    }
                    None => 0,
                };
                row.push(value);
            }
            row
        })
        .collect();

    let mut buffer = Vec::with_capacity(res_x * res_y);
    for row in rows {
        buffer.extend(row);
    }

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let img = GrayImage::from_raw(res_x as u32, res_y as u32, buffer).ok_or_else(|| {
        PipelineError::Config("render buffer does not match resolution".to_string())
    })?;
    img.save(file_path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cameras::create_cameras_around_object;
    use crate::lights::create_lights_on_half_sphere;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn render_produces_a_lit_image() {
        let mesh = Mesh::primitive_cube("cube", 2.0);
        let cameras = create_cameras_around_object(&mesh, 6.0, 2.0, 1, 1.0);
        let mut rng = StdRng::seed_from_u64(2);
        let lights = create_lights_on_half_sphere(&mesh, 5.0, 1, 800.0, &mut rng);

        let settings = RenderSettings {
            resolution_x: 64,
            resolution_y: 48,
            resolution_percentage: 100,
        };
        let dir = std::env::temp_dir().join("anomaly-data-generator-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("render.png");

        render_object(&mesh, &cameras[0], &lights, &settings, &path).unwrap();

        let img = image::open(&path).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (64, 48));
        // the cube must cover some pixels and leave background around it
        let lit = img.pixels().filter(|p| p.0[0] > 0).count();
        assert!(lit > 0);
        assert!(lit < (64 * 48));
    }
}
