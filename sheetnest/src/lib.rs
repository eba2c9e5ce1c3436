//! `sheetnest` packs vector parts onto rectangular material sheets.
//!
//! The engine flattens SVG-style vector paths into polygons, runs robust boolean
//! geometry on a fixed-point integer lattice, and places parts either by their
//! bounding boxes (shelf packing) or by their true outlines (shape-aware packing),
//! honoring rotation, mirroring, keep-out zones and previously locked placements.
//! It holds no state between runs: every invocation is a pure function of its
//! inputs and a seed.

/// Entities to model parts, sheets and nesting results
pub mod entities;

/// Geometric primitives, path flattening and the integer boolean kernel
pub mod geometry;

/// Importing jobs into and exporting layouts out of this library
pub mod io;

/// The shelf and shape-aware packing algorithms
pub mod packing;

/// Helper functions which do not belong to any specific module
pub mod util;

mod error;

pub use error::NestError;
