use thiserror::Error;

#[derive(Debug, Error)]
pub enum InterfaceError {
    #[error("interface \"{0}\" is offline")]
    Offline(String),

    #[error("payload of {len} bytes exceeds interface MDU of {mdu}")]
    ExceedsMdu { len: usize, mdu: usize },
}

pub type Result<T> = std::result::Result<T, InterfaceError>;
