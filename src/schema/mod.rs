//! Schema introspection: raw document, descriptors, validation fragments, runtime resolution.

pub mod types;
pub mod model;
pub mod introspect;
pub mod validator;
pub mod fragments;
pub mod resolved;

pub use types::*;
pub use model::*;
pub use introspect::*;
pub use validator::*;
pub use fragments::*;
pub use resolved::*;
