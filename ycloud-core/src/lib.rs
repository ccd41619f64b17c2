//! ycloud Core
//!
//! Provider-agnostic resource model: attribute values, desired resources,
//! observed state, attribute schemas and the provider trait.

pub mod differ;
pub mod provider;
pub mod resource;
pub mod schema;
