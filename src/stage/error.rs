use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Filesystem failure while replacing the destination tree.
///
/// Nothing is rolled back: the destination may be half removed or half copied.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("source {} exists but is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("source {} and destination {} overlap", source_dir.display(), destination.display())]
    Overlap {
        source_dir: PathBuf,
        destination: PathBuf,
    },

    #[error("failed to resolve {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },
}
