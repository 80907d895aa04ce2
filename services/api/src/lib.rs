pub mod adapters;
pub mod config;
pub mod error;
pub mod sessions;
pub mod web;
