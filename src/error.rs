//! Unified error types for the RelayBox firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! command surface and the control loop's error handling uniform.  Nothing
//! in here is fatal: the engine degrades every malformed input to a safe
//! default and only reports rejections back to the caller.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A candidate rules document failed validation.
    Validation(ConfigValidationError),
    /// An override was attempted on a relay owned by an enabled shutter.
    ReservedRelay { relay: usize },
    /// Relay number outside `1..=relay_count`.
    RelayOutOfRange { relay: usize },
    /// Shutter number outside `1..=shutter_count`.
    ShutterOutOfRange { shutter: usize },
    /// The addressed shutter exists but is not enabled.
    ShutterDisabled { shutter: usize },
    /// A document could not be deserialised.
    Parse,
    /// The configuration store failed.
    Store(StoreError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "{e}"),
            Self::ReservedRelay { .. } => write!(f, "relay reserved by shutter"),
            Self::RelayOutOfRange { .. } => write!(f, "relay out of range"),
            Self::ShutterOutOfRange { .. } => write!(f, "id out of range"),
            Self::ShutterDisabled { .. } => write!(f, "no shutter configured"),
            Self::Parse => write!(f, "bad json"),
            Self::Store(e) => write!(f, "store: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// Reasons a rules document is rejected.  The `Display` text is returned
/// verbatim to the HTTP/MQTT collaborator.
///
/// Shutter numbers are 1-based, matching the document's array position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// `relays` length differs from the detected relay count.
    RelayCountMismatch { expected: usize, actual: usize },
    InputOutOfRange { shutter: usize },
    RelayOutOfRange { shutter: usize },
    SameRelay { shutter: usize },
    InvalidMode { shutter: usize },
    InvalidPriority { shutter: usize },
    /// Two enabled shutters claim the same relay.
    RelayConflict,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RelayCountMismatch { expected, .. } => {
                write!(f, "relays must be array size {expected}")
            }
            Self::InputOutOfRange { shutter } => {
                write!(f, "shutter {shutter}: up_in/down_in out of range")
            }
            Self::RelayOutOfRange { shutter } => {
                write!(f, "shutter {shutter}: up_relay/down_relay out of range")
            }
            Self::SameRelay { shutter } => {
                write!(f, "shutter {shutter}: up_relay and down_relay must be different")
            }
            Self::InvalidMode { shutter } => write!(f, "shutter {shutter}: mode must be hold|toggle"),
            Self::InvalidPriority { shutter } => {
                write!(f, "shutter {shutter}: priority must be stop|up|down")
            }
            Self::RelayConflict => write!(f, "shutters conflict: relays overlap"),
        }
    }
}

impl From<ConfigValidationError> for Error {
    fn from(e: ConfigValidationError) -> Self {
        Self::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// No document persisted yet (first boot).
    NotFound,
    /// Stored bytes could not be decoded.
    Corrupted,
    /// Partition is full.
    Full,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "document not found"),
            Self::Corrupted => write!(f, "document corrupted"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "fs write failed"),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The module at this address did not acknowledge.
    NoAck { addr: u8 },
    /// A register transfer failed mid-way.
    Transfer { addr: u8 },
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAck { addr } => write!(f, "no ACK from 0x{addr:02X}"),
            Self::Transfer { addr } => write!(f, "transfer to 0x{addr:02X} failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
