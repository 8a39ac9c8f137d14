// ABOUTME: The three portability operations: export, import, validate
// ABOUTME: Export reads the live connection; import mutates it transactionally; validate only inspects archives

pub mod export;
pub mod import;
pub mod validate;

pub use export::export_to;
pub use import::{import_from, ImportMode};
pub use validate::validate_archive;
