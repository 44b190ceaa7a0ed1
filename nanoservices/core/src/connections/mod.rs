pub mod local;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;
pub use sqlite::SqliteWarehouse;
pub use traits::{ConnectionHandles, ObjectStore, Warehouse};
