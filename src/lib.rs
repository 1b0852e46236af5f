pub mod analysis;
pub mod api;
pub mod extract;
pub mod models;
pub mod refresh;
pub mod registry;
pub mod report;
pub mod store;
