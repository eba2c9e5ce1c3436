//! Entities modeling a nesting job: parts, sheets, placements and results.

mod instance;
mod part;
mod placement;
mod result;
mod sheet;

#[doc(inline)]
pub use instance::NestInstance;

#[doc(inline)]
pub use instance::PackMode;

#[doc(inline)]
pub use part::Part;

#[doc(inline)]
pub use part::PartBuilder;

#[doc(inline)]
pub use placement::LockedPlacement;

#[doc(inline)]
pub use placement::Placement;

#[doc(inline)]
pub use placement::SheetLayout;

#[doc(inline)]
pub use result::NestingResult;

#[doc(inline)]
pub use sheet::KeepOutRect;

#[doc(inline)]
pub use sheet::SheetConfig;
