pub mod adapter;
pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod models;
