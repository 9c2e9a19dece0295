pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod response;
pub mod validation;
