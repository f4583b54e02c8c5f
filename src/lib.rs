//! Blogicum - a small blog publishing platform
//!
//! Authors publish posts (optionally scheduled, optionally in a category and
//! at a location) and comment on each other's posts. This library holds the
//! visibility and authorization policies, pagination, the storage layer and
//! the HTTP API.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod policy;
pub mod services;
