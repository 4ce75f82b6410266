pub mod coordinate_system;
pub mod labels;
pub mod render_settings;
pub mod sampling;

pub use coordinate_system::*;
pub use labels::*;
pub use render_settings::*;
pub use sampling::*;
