//! Error types for corsair-rgb-core.

use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HID device communication failure.
    #[error("HID error: {0}")]
    Hid(String),

    /// Device not found or could not be opened.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The session already holds an open HID channel.
    #[error("session is already attached to a device")]
    AlreadyAttached,

    /// An operation that needs an open channel was called before attach.
    #[error("session is not attached to a device")]
    NotAttached,

    /// The session was closed; it can not be attached again.
    #[error("session is closed")]
    SessionClosed,
}

impl From<hidapi::HidError> for Error {
    fn from(e: hidapi::HidError) -> Self {
        Error::Hid(e.to_string())
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    /// Every variant a session or transport call can produce, with its message.
    fn produced_by_library(e: &Error) -> &'static str {
        match e {
            Error::Hid(_) => "transport",
            Error::DeviceNotFound(_) => "open",
            Error::AlreadyAttached | Error::NotAttached | Error::SessionClosed => "session state",
        }
    }

    #[test]
    fn messages_name_the_failure() {
        let cases = [
            (Error::Hid("write failed".into()), "HID error: write failed", "transport"),
            (Error::DeviceNotFound("1B1C:1B6B".into()), "device not found: 1B1C:1B6B", "open"),
            (Error::AlreadyAttached, "session is already attached to a device", "session state"),
            (Error::NotAttached, "session is not attached to a device", "session state"),
            (Error::SessionClosed, "session is closed", "session state"),
        ];
        for (err, message, source) in cases {
            assert_eq!(err.to_string(), message);
            assert_eq!(produced_by_library(&err), source);
        }
    }
}
