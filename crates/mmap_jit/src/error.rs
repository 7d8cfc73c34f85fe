use errno::Errno;

pub type Result<T> = std::result::Result<T, MappingError>;

/// Any error thrown while mapping memory.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MappingError {
    /// The kernel refused an `mmap(2)` or `mprotect(2)` call.
    #[error("{0}")]
    Internal(Errno),
    /// Zero-length mappings are rejected by `mmap(2)` anyway; this says so up front.
    #[error("cannot map a region of zero bytes")]
    EmptyRegion,
}

impl From<Errno> for MappingError {
    fn from(e: Errno) -> Self {
        MappingError::Internal(e)
    }
}
