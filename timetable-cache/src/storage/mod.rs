//! SQLite storage for cached timetables.
//!
//! [`StorageGateway`] owns the database and hands out read and write
//! connections. The [`schema`] module defines the versioned row layout and
//! the codecs that map rows to [`TimetableEntry`](crate::domain::TimetableEntry)
//! values.

mod config;
mod error;
mod gateway;
pub mod schema;

pub use config::{GatewayConfig, StoreLocation};
pub use error::{DecodeError, StorageError};
pub use gateway::{ReadHandle, StorageGateway, WriteHandle};
pub use schema::{RowCodec, SchemaVersion, TRAIN_NAME_NULL, UnknownSchemaVersion, column_list};
