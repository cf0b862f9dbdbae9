//! Lead management web application.
//!
//! Server-rendered pages to register, list, search, edit and delete sales
//! leads. Each new lead is pushed once to an external workflow webhook.
//!
//! # Modules
//!
//! - `app`: Router assembly and HTTP middleware.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Storage trait and the Postgres backend.
//! - `errors`: Error handling types.
//! - `flash`: One-shot messages across redirects.
//! - `handlers`: HTTP request handlers.
//! - `memory_store`: In-process storage backend.
//! - `models`: Core data models.
//! - `query`: Search and pagination.
//! - `services`: Lead lifecycle orchestration.
//! - `templates`: Page rendering.
//! - `validation`: Form validation rules.
//! - `webhook_client`: Lead-created webhook client.

pub mod app;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod flash;
pub mod handlers;
pub mod memory_store;
pub mod models;
pub mod query;
pub mod services;
pub mod templates;
pub mod validation;
pub mod webhook_client;
