//! OpenAPI document generation
//!
//! Every [`Api`](crate::api::Api) owns an OpenAPI 3.1 document built from
//! the method maps of its resources and served at `{root}/docs`.

mod endpoint;
mod operation;
mod spec;

pub use endpoint::*;
pub use operation::*;
pub use spec::*;
