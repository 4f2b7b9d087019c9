//! Library half of the `glucast` command line tool: run configuration,
//! the prediction pipeline and blending.
pub mod predict;
