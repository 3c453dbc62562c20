//! Resource SDK: generic REST resources over typed records.
//!
//! A record type implements [`Record`] (and [`ChildRecord`] for dependents) and points at a
//! static [`RecordDescriptor`]. [`resource_routes`] then exposes create (with children),
//! read, update and delete for it over any [`Gateway`], answering with the
//! `{ code, message, data }` [`Envelope`].

pub mod case;
pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{init_tracing, ServerConfig};
pub use error::{AppError, ConfigError, StoreError, StoreErrorKind};
pub use model::{
    nullable, ChildRecord, ChildSet, ColumnDescriptor, Record, RecordDescriptor, RelationDescriptor, Row,
};
pub use response::{error_body, success, Envelope, RetCode};
pub use routes::{common_routes, cors_layer, resource_routes};
pub use service::ResourceService;
pub use state::AppState;
pub use store::{Gateway, GatewayTx, MemoryGateway, PgGateway};
