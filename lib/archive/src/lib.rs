//! Archive storage for roundtable.
//!
//! Finished transcripts and memory blobs are handed to an [`ArchiveSink`],
//! which persists them and answers with a numeric file handle plus a
//! content reference derived from the bytes.
//!
//! Backends:
//!
//! - [`InMemoryArchive`]: process-local, for tests and dry runs
//! - [`DirectoryArchive`]: content-addressed blobs under a namespace directory
//! - [`GatewayClient`]: read-only resolution of content references over HTTP

pub mod directory;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod sink;

pub use directory::DirectoryArchive;
pub use error::StorageError;
pub use gateway::GatewayClient;
pub use memory::InMemoryArchive;
pub use sink::{
    AddedFile, ArchiveObserver, ArchiveSink, ContentRef, ContentResolver, CreatedFile, FileId,
    Observers,
};
