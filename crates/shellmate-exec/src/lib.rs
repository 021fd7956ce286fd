pub mod contracts;
pub mod gateway;
pub mod runner;

pub use contracts::*;
pub use gateway::*;
pub use runner::*;
