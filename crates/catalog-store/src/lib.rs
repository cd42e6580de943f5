//! Catalog storage.
//!
//! - [`CatalogStore`] / [`StoreTransaction`]: the storage seam used by the
//!   import pipeline, data delete and publish.
//! - [`MemoryStore`]: mutex-serialised in-memory implementation, persisted
//!   with [`save_catalog_file`] / [`load_catalog_file`].
//! - [`EntityRepository`]: typed entity access with timestamps and cascading
//!   delete.
//! - [`query_data`] / [`delete_data`]: data access by data set, variable and
//!   attribute.
//! - [`publish`]: copies a catalog to a target catalog.

mod catalog_file;
mod data;
mod error;
mod memory;
mod publish;
#[cfg(any(test, feature = "test-support"))]
mod recording;
mod repository;
mod store;

pub use catalog_file::{CATALOG_FILE_VERSION, load_catalog_file, save_catalog_file};
pub use data::{DataSetData, delete_data, query_data};
pub use error::{Result, StoreError};
pub use memory::{CatalogData, CatalogSnapshot, MemoryStore, MemoryTransaction};
pub use publish::{PublishSummary, publish};
#[cfg(any(test, feature = "test-support"))]
pub use recording::{RecordingStore, StoreEvent};
pub use repository::{AttributeCreator, EntityRepository};
pub use store::{CatalogStore, StoreTransaction};
