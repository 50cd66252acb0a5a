//! Domain records shared by the store, the tracker gateway, and the pipelines.

pub mod dast;
pub mod engagement;
pub mod findings;
pub mod ids;
pub mod image;
pub mod project;
pub mod scanner;

pub use dast::*;
pub use engagement::*;
pub use findings::*;
pub use ids::*;
pub use image::*;
pub use project::*;
pub use scanner::*;
