//! HTTP API Module
//!
//! Provides a REST API for cars stored behind the broadcast router.

mod cars;
mod http;

pub use cars::{Car, CarService};
pub use http::{AppState, HttpServer};
