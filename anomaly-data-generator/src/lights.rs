/// Point lights scattered on a half sphere above the object.
use crate::mesh::Mesh;
use nalgebra::Point3;
use rand::Rng;
use rand::rngs::StdRng;

#[derive(Debug, Clone)]
pub struct PointLight {
    pub name: String,
    pub position: Point3<f64>,
    pub energy: f64,
}

/// Create random lights on an imaginary half sphere above the object's
/// centre location.
pub fn create_lights_on_half_sphere(
    mesh: &Mesh,
    radius: f64,
    num_lights: usize,
    energy: f64,
    rng: &mut StdRng,
) -> Vec<PointLight> {
    let mut lights = Vec::with_capacity(num_lights);
    let loc = mesh.bounding_box_center();

    for i in 0..num_lights {
        // Random spherical coordinates on the upper hemisphere
        let theta = rng.random_range(0.0..=std::f64::consts::FRAC_PI_2);
        let phi = rng.random_range(0.0..=2.0 * std::f64::consts::PI);

        let x = loc.x + radius * theta.sin() * phi.cos();
        let y = loc.y + radius * theta.sin() * phi.sin();
        let z = loc.z + radius * theta.cos();

        lights.push(PointLight {
            name: format!("Light{i}"),
            position: Point3::new(x, y, z),
            energy,
        });
    }

    lights
}

/// Turn on one light at a time and keep the rest off.
pub fn turn_on_one_light(lights: &mut [PointLight], index: usize, energy: f64) {
    for (i, light) in lights.iter_mut().enumerate() {
        light.energy = if i == index { energy } else { 0.0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn lights_sit_on_the_upper_hemisphere() {
        let mesh = Mesh::primitive_cube("cube", 2.0);
        let mut rng = StdRng::seed_from_u64(7);
        let lights = create_lights_on_half_sphere(&mesh, 4.0, 16, 1000.0, &mut rng);

        assert_eq!(lights.len(), 16);
        for light in &lights {
            assert!(light.position.z >= -1e-9);
            assert!((light.position.coords.norm() - 4.0).abs() < 1e-9);
            assert!((light.energy - 1000.0).abs() < 1e-12);
        }
    }

    #[test]
    fn only_the_selected_light_is_energised() {
        let mesh = Mesh::primitive_cube("cube", 2.0);
        let mut rng = StdRng::seed_from_u64(7);
        let mut lights = create_lights_on_half_sphere(&mesh, 4.0, 4, 1000.0, &mut rng);

        turn_on_one_light(&mut lights, 2, 1000.0);
        for (i, light) in lights.iter().enumerate() {
            if i == 2 {
                assert!(light.energy > 0.0);
            } else {
                assert_eq!(light.energy, 0.0);
            }
        }
    }
}
