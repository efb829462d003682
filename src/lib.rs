//! Generate BIND 9 zone files and `named.conf` configurations.
//!
//! Build a [`zones::types::Zone`] or a [`conf::types::BindConf`] with
//! the append-only builder methods, then render it to a string, a
//! stream, or a file.  File writes are atomic.
#![warn(clippy::pedantic)]
// Don't care enough to fix
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::wildcard_imports)]

pub mod conf;
pub mod error;
pub mod settings;
pub mod writer;
pub mod zones;

pub use self::error::Error;
