//! ResourceService: typed create/read/update/delete over the persistence gateway.

mod resource;
pub use resource::{parse_id, ResourceService};
