/// Surface anomaly dataset generator main entry point
use anomaly_data_generator::config::PipelineConfig;
use anomaly_data_generator::pipelines::{DataGenerator, ImageRender};
use anomaly_data_generator::scene::Scene;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::env;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <config.json> [data|render|all]", args[0]);
        std::process::exit(1);
    }

    let stage = args.get(2).map(String::as_str).unwrap_or("data");
    if !["data", "render", "all"].contains(&stage) {
        eprintln!("Unknown stage `{stage}`, expected data, render or all");
        std::process::exit(1);
    }

    let config = PipelineConfig::from_file(Path::new(&args[1]))?;

    // One owned generator per run keeps results reproducible per seed.
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut scene = Scene::new(config.render.clone());

    if stage == "data" || stage == "all" {
        println!("Generating point clouds...");
        let mesh_paths = DataGenerator::new(&config).run(&mut scene, &mut rng)?;
        println!("Processed {} mesh variants", mesh_paths.len());
    }

    if stage == "render" || stage == "all" {
        println!("Rendering images...");
        ImageRender::new(&config).run(&mut scene, &mut rng)?;
    }

    Ok(())
}
