use anomaly_data_generator::anomaly::{AnomalyParams, apply_anomaly};
use anomaly_data_generator::config::PipelineConfig;
use anomaly_data_generator::mesh::{Mesh, write_stl};
use anomaly_data_generator::pipelines::{DataGenerator, ImageRender};
use anomaly_data_generator::point_cloud::read_labeled_csv;
use anomaly_data_generator::sampling::mesh_to_point_clouds;
use anomaly_data_generator::scene::Scene;
use constants::render_settings::RenderSettings;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

fn test_root(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("anomaly-data-generator-integration")
        .join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_test_config(root: &Path) -> PathBuf {
    let model_path = root.join("assets/widget.stl");
    write_stl(&Mesh::primitive_cube("widget", 2.0), &model_path).unwrap();

    let config = serde_json::json!({
        "seed": 7,
        "file_paths": { "model_path": model_path },
        "input_paths": {
            "mesh_path_reference": root.join("meshes/reference"),
            "anomaly_path": root.join("meshes/anomaly"),
            "point_cloud_path": root.join("point_clouds"),
            "renders_path": root.join("renders"),
            "dataset_path": root.join("dataset")
        },
        "model": { "num_of_bisect": 2, "num_generations": 1 },
        "anomaly_settings": {
            "sigma_loc": 0.1, "sigma_scale": 0.02,
            "strength_loc": 0.05, "strength_scale": 0.01,
            "influence_radius_loc": 0.3, "influence_radius_scale": 0.05,
            "pull_prob": 1.0
        },
        "camera_setting": { "radius": 6.0, "height": 3.0, "num_of_cameras": 2 },
        "light_setting": { "radius": 4.0, "num_lights": 1, "energy": 600.0 },
        "point_cloud": {
            "fraction_of_points": 0.5,
            "fraction_of_variation": 0.3,
            "std_scale": 0.01
        },
        "render": {
            "resolution_x": 48,
            "resolution_y": 36,
            "resolution_percentage": 100
        }
    });

    let path = root.join("main_config.json");
    fs::write(&path, config.to_string()).unwrap();
    path
}

#[test]
fn unit_cube_anomaly_displaces_a_top_corner() {
    // seed policy lands on a top vertex; radius 0.3 on a side-2 cube
    // reaches between one and all eight vertices of the top region
    let mut mesh = Mesh::primitive_cube("cube", 2.0);
    let original = mesh.vertices.clone();
    let mut rng = StdRng::seed_from_u64(1);

    let params = AnomalyParams {
        sigma: 0.1,
        strength: 0.05,
        influence_radius: 0.3,
        direction_sign: 1.0,
    };
    let displaced = apply_anomaly(&mut mesh, &params, &mut rng).unwrap();

    assert!(!displaced.is_empty() && displaced.len() <= 8);
    for &v in &displaced {
        let delta = mesh.vertices[v as usize] - original[v as usize];
        assert!(delta.z > 0.0 && delta.z <= 0.05 + 1e-12);
        // displaced vertices sit on the original top plane
        assert!((original[v as usize].z - 1.0).abs() < 1e-9);
    }

    // the anomaly face set touches only faces incident to top vertices
    let mut rng = StdRng::seed_from_u64(2);
    let (_, labels) = mesh_to_point_clouds(&mut mesh, 300, &displaced, 1, &mut rng).unwrap();
    let anomaly_faces: HashSet<u32> = mesh
        .polygons
        .iter()
        .enumerate()
        .filter(|(_, poly)| poly.iter().any(|v| displaced.contains(v)))
        .map(|(i, _)| i as u32)
        .collect();
    assert!(!anomaly_faces.is_empty());
    // the bottom quad of the primitive cube never touches a top vertex
    assert!(!anomaly_faces.contains(&0));
    assert!(labels.iter().any(|&l| l));
}

#[test]
fn anomaly_face_set_grows_monotonically() {
    let mesh = Mesh::primitive_cube("cube", 2.0);
    let face_set = |vertices: &HashSet<u32>| -> HashSet<u32> {
        mesh.polygons
            .iter()
            .enumerate()
            .filter(|(_, poly)| poly.iter().any(|v| vertices.contains(v)))
            .map(|(i, _)| i as u32)
            .collect()
    };

    let small: HashSet<u32> = [6u32].into_iter().collect();
    let large: HashSet<u32> = [6u32, 0].into_iter().collect();

    let small_faces = face_set(&small);
    let large_faces = face_set(&large);
    assert!(small_faces.is_subset(&large_faces));
    assert!(large_faces.len() >= small_faces.len());
}

#[test]
fn thousand_point_sample_without_anomalies() {
    let mut mesh = Mesh::primitive_cube("cube", 2.0);
    let mut rng = StdRng::seed_from_u64(3);

    let (points, labels) =
        mesh_to_point_clouds(&mut mesh, 1000, &HashSet::new(), 1, &mut rng).unwrap();

    assert_eq!(points.len(), 1000);
    assert_eq!(labels.len(), 1000);
    assert!(labels.iter().all(|&l| !l));

    // every cube face has equal area, so the per-polygon hit counts
    // should be roughly uniform
    let mut per_face = [0usize; 6];
    for p in &points {
        let face = if (p.z + 1.0).abs() < 1e-9 {
            0
        } else if (p.z - 1.0).abs() < 1e-9 {
            1
        } else if (p.y + 1.0).abs() < 1e-9 {
            2
        } else if (p.x - 1.0).abs() < 1e-9 {
            3
        } else if (p.y - 1.0).abs() < 1e-9 {
            4
        } else {
            5
        };
        per_face[face] += 1;
    }
    for count in per_face {
        // expectation ~167 per face; allow wide sampling noise
        assert!(count > 100 && count < 240, "face count {count}");
    }
}

#[test]
fn data_pipeline_produces_clouds_and_datasets() {
    let root = test_root("data-pipeline");
    let config = PipelineConfig::from_file(&write_test_config(&root)).unwrap();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut scene = Scene::new(config.render.clone());

    let mesh_paths = DataGenerator::new(&config)
        .run(&mut scene, &mut rng)
        .unwrap();

    // reference export plus at least one bisect variant
    assert!(mesh_paths.len() >= 2);
    assert!(mesh_paths[0].ends_with("reference_widget.stl"));

    let clouds = root.join("point_clouds");
    let reference_csv = clouds.join("reference/reference_widget.csv");
    assert!(reference_csv.is_file());
    assert!(clouds.join("reference/reference_widget.las").is_file());
    assert!(clouds.join("reference/reference_widget_vray.stl").is_file());

    // reference clouds carry only False labels
    let (points, labels) = read_labeled_csv(&reference_csv).unwrap();
    assert!(!points.is_empty());
    assert!(labels.iter().all(|&l| !l));

    // normal and anomaly variations for generation zero
    assert!(clouds.join("normal/normal_widget_v0.csv").is_file());
    let anomaly_csv = clouds.join("anomaly/anomaly_widget_v0.csv");
    assert!(anomaly_csv.is_file());

    // anomalous meshes are exported for the render pipeline
    assert!(
        root.join("meshes/anomaly/anomaly_widget_v0.stl").is_file()
    );

    // distance datasets join every candidate cloud with its reference
    let dataset_files: Vec<_> = fs::read_dir(root.join("dataset"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert!(!dataset_files.is_empty());
    let sample = fs::read_to_string(&dataset_files[0]).unwrap();
    let mut lines = sample.lines();
    assert_eq!(lines.next(), Some("x,y,z,dist,label"));
    for line in lines.take(5) {
        let dist: f64 = line.split(',').nth(3).unwrap().parse().unwrap();
        assert!(dist >= 0.0);
    }
}

#[test]
fn render_pipeline_writes_one_png_per_combination() {
    let root = test_root("render-pipeline");
    let config = PipelineConfig::from_file(&write_test_config(&root)).unwrap();
    config.ensure_directories().unwrap();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut scene = Scene::new(RenderSettings {
        resolution_x: 48,
        resolution_y: 36,
        resolution_percentage: 100,
    });

    ImageRender::new(&config).run(&mut scene, &mut rng).unwrap();

    let reference_renders: Vec<_> = fs::read_dir(root.join("renders/reference"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    // main object only (no bisects generated in this run): 2 cameras x 1 light
    assert_eq!(reference_renders.len(), 2);
    for path in &reference_renders {
        let img = image::open(path).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (48, 36));
    }
}
