use strand_types::BlockId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DagError {
    /// Block inserted before one of its parents.
    #[error("block {0} references a parent that is not indexed")]
    MissingParents(BlockId),

    /// Block id already indexed.
    #[error("block {0} is already indexed")]
    DuplicateBlock(BlockId),

    /// The recomputed last-common frontier is neither an advance nor a
    /// rollback of the previous one. Fatal: the derived sets are no longer
    /// trustworthy.
    #[error("last-common frontier is neither an advance nor a rollback")]
    CommonSetInconsistent,
}
