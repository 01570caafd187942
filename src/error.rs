use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("archive root unreadable: {}", .0.display())]
    ArchiveUnreadable(PathBuf),
    #[error("users table unreadable: {}", path.display())]
    UsersTableUnreadable {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("config invalid: {0}")]
    InvalidConfig(String),
}
