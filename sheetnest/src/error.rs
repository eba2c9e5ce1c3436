use thiserror::Error;

/// All errors the engine can report to a caller.
///
/// Boolean-op failures are absent: the kernel recovers from them locally by
/// returning the pre-operation geometry unchanged (see
/// [`crate::geometry::kernel`]). Unplaceable parts and cancellation are normal
/// outcomes surfaced through [`crate::entities::NestingResult`], not errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NestError {
    /// The path grammar contained a command letter the flattener does not know.
    /// Fatal to the ingestion of that single part, not to the whole run.
    #[error("unknown path command '{command}' at byte {offset}")]
    Parse { command: char, offset: usize },

    /// The sheet configuration cannot hold any part. Fatal to the whole run,
    /// reported before any placement is attempted.
    #[error("invalid sheet configuration: {0}")]
    Config(String),

    /// A part definition produced no usable geometry.
    #[error("part '{id}' has no usable geometry: {reason}")]
    Build { id: String, reason: String },
}
