/// Synthetic anomaly dataset generation for 3D surface inspection:
/// procedurally perturbed mesh variants, visibility-aware point cloud
/// sampling with per-point labels, and distance-joined training tables.
pub mod anomaly;
pub mod bisect;
pub mod cameras;
pub mod config;
pub mod dataset;
pub mod error;
pub mod influence;
pub mod jitter;
pub mod lights;
pub mod mesh;
pub mod pipelines;
pub mod point_cloud;
pub mod ray;
pub mod render;
pub mod sampling;
pub mod scene;
pub mod visibility;
