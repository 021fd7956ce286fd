pub mod actions;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod profile;
pub mod reducer;
pub mod sanitizer;
pub mod state;

pub use actions::*;
pub use engine::*;
pub use error::*;
pub use history::*;
pub use profile::*;
pub use reducer::*;
pub use state::*;
