/// External (serializable) representations of jobs and solutions.
pub mod ext_repr;

/// All logic for converting external job descriptions into internal ones
pub mod import;

/// All logic for exporting internal representations into external ones
pub mod export;

/// All logic for rendering [`SheetLayout`](crate::entities::SheetLayout)s as SVG
pub mod svg;
