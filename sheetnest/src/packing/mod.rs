//! The two placement algorithms and their shared search machinery.
//!
//! [`pack_shelf`] is the fast path: bounding boxes in rows, no kernel
//! involvement. [`ShapeNester`] is the accurate path: true outlines, keep-out
//! zones, pinned placements and seeded exploration. Both consume a
//! [`NestInstance`](crate::entities::NestInstance) and produce a
//! [`NestingResult`](crate::entities::NestingResult).

mod sampler;
mod shape;
mod shelf;
mod strategy;

#[doc(inline)]
pub use shape::ShapeNester;
#[doc(inline)]
pub use shelf::pack_shelf;
#[doc(inline)]
pub use strategy::{SearchParams, Strategy};
