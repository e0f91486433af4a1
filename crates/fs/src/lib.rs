//! largo-fs: filesystem-backed object store
//!
//! Implements the `ObjectStore` trait from largo-core on top of a local
//! directory tree. Each container is a directory below the store root and
//! each object is a data file paired with a JSON record.

pub mod store;

pub use store::FsStore;
