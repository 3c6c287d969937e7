pub mod ids;
pub mod scene;

pub use ids::*;
pub use scene::*;
