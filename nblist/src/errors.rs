#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// Got an invalid parameter value in a function: bad cell range,
    /// negative skin, degenerate unit cell, ...
    InvalidParameter(String),
    /// Cells or neighbor lists were used before being built, or after the
    /// system geometry changed under them
    Uninitialized(String),
    /// Error while serializing/deserializing settings
    Json(serde_json::Error),
    /// Error used when a panic was caught, typically in a worker thread
    Panic(String),
    /// Internal error, e.g. a worker thread disappeared
    Internal(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidParameter(e) => write!(f, "invalid parameter: {}", e),
            Error::Uninitialized(e) => write!(f, "not initialized: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
            Error::Panic(e) => write!(f, "internal error: {}", e),
            Error::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidParameter(_) |
            Error::Uninitialized(_) |
            Error::Panic(_) |
            Error::Internal(_) => None,
            Error::Json(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::Json(error)
    }
}

// Box<dyn Any + Send + 'static> is the error type in std::panic::catch_unwind
// and std::thread::JoinHandle::join
impl From<Box<dyn std::any::Any + Send + 'static>> for Error {
    fn from(error: Box<dyn std::any::Any + Send + 'static>) -> Error {
        let message = if let Some(message) = error.downcast_ref::<String>() {
            message.clone()
        } else if let Some(message) = error.downcast_ref::<&str>() {
            (*message).to_owned()
        } else {
            "panic message is not a string".to_owned()
        };

        Error::Panic(message)
    }
}
