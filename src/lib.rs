/*
    Plotting support for the diffusion mini-app's output files.
    A BOV descriptor names a raw dump of doubles and its grid size;
    this crate loads the field and turns it into contour geometry.
*/
pub mod bov;
pub mod contour;
pub mod grid;

pub use bov::{read_field, read_header, read_raw, BovHeader};
pub use grid::Grid;
