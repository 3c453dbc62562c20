pub mod descriptor;
pub mod record;
pub mod relations;

pub use descriptor::*;
pub use record::*;
pub use relations::*;
