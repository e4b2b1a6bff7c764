pub mod catalog_controller;
pub mod error_handling;
mod loading_guard;

pub use catalog_controller::{CatalogController, CatalogState, ControllerOptions, LoadPhase};
pub use error_handling::{CatalogError, CatalogResult, UserErrorFormatter};
