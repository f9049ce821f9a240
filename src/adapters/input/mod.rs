//! Clinical input loaders.

pub mod file;

pub use file::FileInputLoader;
