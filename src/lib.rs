mod macros;

pub mod agent;
pub mod config;
pub mod data;
pub mod error;
pub mod gym;
pub mod io;
pub mod notify;
pub mod prelude;
pub mod report;
