pub mod schema;
pub mod interface;
pub mod error;
pub mod config;
pub mod loader;
pub mod preprocessing;
pub mod clinical;
pub mod mri;
pub mod state;
pub mod routes;
