//! Canonical naming for the media library.
//!
//! - `codec`: file name grammar (parse / serialize)
//! - `directory`: library directory name grammar
//! - `classify`: release quality classification used by reconciliation

pub mod classify;
pub mod codec;
pub mod directory;

pub use classify::{classify, classify_path, Classification};
pub use codec::{parse, serialize, NamedAsset};
pub use directory::{parse_directory, DirectoryName};
