mod assets;
mod error;
mod model;
mod pipeline;
mod routes;
mod server;
mod state;

pub mod config;

pub use server::start_app;
