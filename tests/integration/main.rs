//! Integration tests for cloudsweep
//!
//! These tests run the HTTP client against wiremock servers and use
//! temporary SQLite databases.

mod crawl_tests;
mod delete_tests;
mod pipeline_tests;
mod support;
