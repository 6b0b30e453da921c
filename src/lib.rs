pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod services;

pub use db::create_pool;
