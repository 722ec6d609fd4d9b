//! Prospect Health API Library
//!
//! This library provides the core functionality for the Prospect Health
//! API: a reporting backend that fetches prospect data from an upstream
//! marketing-automation REST API, classifies database health issues, and
//! serves renderer-ready reports, charts, and recommendations.
//!
//! # Modules
//!
//! - `auth`: Bearer-token extraction for per-caller credentials.
//! - `cache`: Checksum-validated response cache and key builders.
//! - `classify`: Duplicate, inactivity, missing-field, and scoring
//!   classification.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `filters`: View and time-window filtering with pagination.
//! - `handlers`: HTTP request handlers.
//! - `health`: Database health aggregation and report assembly.
//! - `models`: Core data models and the renderer contract.
//! - `pardot_client`: Upstream REST API client.

pub mod auth;
pub mod cache;
pub mod classify;
pub mod config;
pub mod errors;
pub mod filters;
pub mod handlers;
pub mod health;
pub mod models;
pub mod pardot_client;
