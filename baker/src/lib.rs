// This file makes `baker` into a rust library crate.

// The file `main.rs` still exists to make `baker` into an executable.

pub mod bake;
pub mod export_to_obj;
pub mod import_obj;
pub mod inputs;
pub mod mesh;
pub mod texturing;

pub use base;
