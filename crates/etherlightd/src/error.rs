//! Error types for etherlightd

use thiserror::Error;

use crate::led::LedError;
use crate::snmp::SnmpError;

/// Etherlight daemon errors
#[derive(Error, Debug)]
pub enum EtherlightError {
    /// SNMP transport or protocol error
    #[error("SNMP error: {0}")]
    Snmp(#[from] SnmpError),

    /// LED strip commit error
    #[error("LED error: {0}")]
    Led(#[from] LedError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Port number outside the configured strip
    #[error("Port {port} out of range (1-{max})")]
    InvalidPort { port: u32, max: usize },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for etherlightd operations
pub type Result<T> = std::result::Result<T, EtherlightError>;
