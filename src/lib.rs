pub mod common;
pub mod layout;
pub mod model;
pub mod persist;
