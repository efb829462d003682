use std::io;
use std::path::PathBuf;

/// An error that can occur building or writing a zone or configuration.
#[derive(Debug)]
pub enum Error {
    /// A record or statement field is missing or out of range.
    Validation { field: String, reason: String },
    /// An IP literal could not be parsed.
    AddressFormat { address: String },
    /// A view already has a zone with this name.
    DuplicateZone { view: String, zone: String },
    /// The configuration already has a view with this name.
    DuplicateView { view: String },
    /// The destination could not be written.
    Io { path: PathBuf, error: io::Error },
}

impl Error {
    pub(crate) fn validation(field: &str, reason: &str) -> Self {
        Error::Validation {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn address_format(address: &str) -> Self {
        Error::AddressFormat {
            address: address.to_string(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Validation { field, reason } => write!(f, "invalid {field}: {reason}"),
            Error::AddressFormat { address } => {
                write!(f, "could not parse IP address '{address}'")
            }
            Error::DuplicateZone { view, zone } => {
                write!(f, "zone '{zone}' already defined in view '{view}'")
            }
            Error::DuplicateView { view } => write!(f, "view '{view}' already defined"),
            Error::Io { path, error } => write!(f, "could not write '{}': {error}", path.display()),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { error, .. } => Some(error),
            _ => None,
        }
    }
}
