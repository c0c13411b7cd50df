pub mod broadcast;
pub mod client;
pub mod config;
pub mod error;
pub mod middleware;
pub mod pose;
pub mod server;
pub mod utils;

pub use server::{Server, serve};
