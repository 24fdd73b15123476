use thiserror::Error;

use crate::NodeId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures of the root-only trie operations.
///
/// A missing entry is not an error; lookups report it as `Ok(None)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// A root-only operation was started from an interior node handle.
    #[error("operation must start at the root node, got node {0}")]
    NotRoot(NodeId),
    /// The prefix length does not fit the key width, so descent would need a
    /// negative bit index.
    #[error("prefix length {bits} exceeds key width {width}")]
    InvalidBitIndex { bits: u8, width: u8 },
}
