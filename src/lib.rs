//! Master-timetable construction: sections to blocks, students to sections.

pub mod compiler;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod model;
pub mod oracle;
pub mod projector;
pub mod search;
pub mod server;
pub mod solver;

pub use config::TimetableConfig;
pub use domain::{Timetable, build};
pub use error::{Result, TimetableError};
pub use search::NeighborhoodSearch;
pub use solver::HighsOracle;
