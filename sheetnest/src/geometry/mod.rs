pub mod flatten;
pub mod kernel;
pub mod pose;
pub mod primitives;

#[doc(inline)]
pub use pose::Pose;
#[doc(inline)]
pub use pose::Rotation;
