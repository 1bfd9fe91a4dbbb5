pub mod domain;
pub mod loader;
pub mod series;
pub mod state;
