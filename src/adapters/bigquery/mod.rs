//! BigQuery adapter implementation
//!
//! This module provides the REST client and the API models it exchanges
//! with the BigQuery v2 API.

pub mod client;
pub mod models;

pub use client::BigQueryClient;
