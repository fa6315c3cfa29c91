//! Visitor Log - records who hits the page and shows everyone who did
//!
//! Each request to `/`:
//! - Resolves the client IP and User-Agent
//! - Looks up an approximate location with a public geolocation API
//! - Appends one JSON line to the visit log
//! - Renders the full log as an HTML table

pub mod config;
pub mod device;
pub mod diagnostics;
pub mod geoip;
pub mod record;
pub mod store;
pub mod web;
