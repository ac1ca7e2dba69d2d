pub mod config;
pub mod frame;
pub mod grid;
pub mod guard;
pub mod routes;
pub mod services;
pub mod state;
