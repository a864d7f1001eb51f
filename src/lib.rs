pub mod instrument;
pub mod logging;
pub mod measurement;
pub mod resolution;
