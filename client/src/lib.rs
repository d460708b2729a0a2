pub mod follow;
pub mod render;
pub mod store;
