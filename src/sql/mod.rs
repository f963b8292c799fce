//! Safe SQL builder: identifiers quoted, values as text parameters.

mod builder;
pub use builder::*;
