use thiserror::Error;

#[derive(Debug, Error)]
pub enum FatError {
    #[error("No such file or directory: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    #[error("No space left on device: {0}")]
    NoSpace(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Directory not empty: {0}")]
    DirectoryNotEmpty(String),

    #[error("Device or resource busy: {0}")]
    Busy(String),

    #[error("File too large: {0}")]
    FileTooLarge(String),

    #[error("Corrupted filesystem: {0}")]
    Corrupted(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(#[from] serde_json::Error),
}

pub type FatResult<T> = Result<T, FatError>;

impl FatError {
    /// POSIX error number for this failure (positive).
    ///
    /// Device faults keep the OS error they were raised with.
    pub fn errno(&self) -> i32 {
        match self {
            FatError::NotFound(_) => libc::ENOENT,
            FatError::AlreadyExists(_) => libc::EEXIST,
            FatError::NotADirectory(_) => libc::ENOTDIR,
            FatError::IsADirectory(_) => libc::EISDIR,
            FatError::NoSpace(_) => libc::ENOSPC,
            FatError::InvalidArgument(_) => libc::EINVAL,
            FatError::DirectoryNotEmpty(_) => libc::ENOTEMPTY,
            FatError::Busy(_) => libc::EBUSY,
            FatError::FileTooLarge(_) => libc::EFBIG,
            FatError::Corrupted(_) => libc::EIO,
            FatError::IoError(e) => e.raw_os_error().unwrap_or(libc::EIO),
            FatError::Configuration(_) => libc::EINVAL,
        }
    }

    /// Negative errno, the convention used at the mount adapter boundary.
    pub fn to_negative_errno(&self) -> i32 {
        -self.errno()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(FatError::NotFound("x".into()).errno(), libc::ENOENT);
        assert_eq!(FatError::DirectoryNotEmpty("d".into()).to_negative_errno(), -libc::ENOTEMPTY);
        assert_eq!(FatError::Busy("/".into()).errno(), libc::EBUSY);
        assert_eq!(FatError::FileTooLarge("f".into()).errno(), libc::EFBIG);
        assert_eq!(FatError::Corrupted("c".into()).errno(), libc::EIO);
    }

    #[test]
    fn test_device_fault_keeps_os_error() {
        let err = FatError::from(std::io::Error::from_raw_os_error(libc::EACCES));
        assert_eq!(err.errno(), libc::EACCES);

        let err = FatError::from(std::io::Error::new(std::io::ErrorKind::Other, "bad sector"));
        assert_eq!(err.errno(), libc::EIO);
    }
}
