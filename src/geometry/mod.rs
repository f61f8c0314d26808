pub mod essential;
pub mod triangulation;

pub use essential::*;
pub use triangulation::*;
