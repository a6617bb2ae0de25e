//! CLI command implementations

pub mod import;
pub mod init;
pub mod translate;
pub mod validate;
