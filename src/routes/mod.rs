//! Route builders.

pub mod common;
pub mod resource;

pub use common::{common_routes, cors_layer};
pub use resource::resource_routes;
