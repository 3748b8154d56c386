// src/lib.rs
pub mod api;
pub mod banner;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod models;
pub mod sandbox;
