use serde::{Deserialize, Serialize};

/// Default render resolution (pixels)
pub const DEFAULT_RESOLUTION_X: usize = 640;
pub const DEFAULT_RESOLUTION_Y: usize = 480;

/// Default resolution percentage applied on top of the base resolution
pub const DEFAULT_RESOLUTION_PERCENTAGE: u32 = 100;

/// Default camera optics (millimetres)
pub const DEFAULT_FOCAL_LENGTH: f64 = 35.0;
pub const DEFAULT_SENSOR_WIDTH: f64 = 36.0;

/// Render output settings shared by the visibility culler and the
/// image render pipeline. The pixel grid both of them walk is derived
/// from these values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    pub resolution_x: usize,
    pub resolution_y: usize,
    pub resolution_percentage: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            resolution_x: DEFAULT_RESOLUTION_X,
            resolution_y: DEFAULT_RESOLUTION_Y,
            resolution_percentage: DEFAULT_RESOLUTION_PERCENTAGE,
        }
    }
}

impl RenderSettings {
    /// Effective pixel dimensions after applying the resolution percentage
    pub fn effective_resolution(&self) -> (usize, usize) {
        let scale = self.resolution_percentage as f64 / 100.0;
        (
            (self.resolution_x as f64 * scale) as usize,
            (self.resolution_y as f64 * scale) as usize,
        )
    }
}
