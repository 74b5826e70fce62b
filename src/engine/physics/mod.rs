pub mod body;
pub mod cell;
pub mod constants;
pub mod gravity;
pub mod integrator;
pub mod world_bounds;

pub use body::*;
pub use cell::*;
pub use constants::*;
pub use world_bounds::*;
