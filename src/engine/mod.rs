pub mod collision;
pub mod config;
pub mod debug;
pub mod error;
pub mod physics;
pub mod scheduler;
pub mod sound;
pub mod state;
pub mod trajectory;

pub use collision::*;
pub use config::*;
pub use debug::*;
pub use error::*;
pub use physics::*;
pub use scheduler::*;
pub use sound::*;
pub use state::*;
pub use trajectory::*;
