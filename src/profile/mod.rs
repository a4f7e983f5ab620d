//! User profiles and their in-memory store.

pub mod model;
pub mod store;

pub use model::{Gender, Profile};
pub use store::ProfileStore;
