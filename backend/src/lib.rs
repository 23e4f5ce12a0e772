//! Crypto price projection: fetch a price history, fit a trend, and project it
//! forward by hour, day, month or year.
//!
//! The same pipeline backs the HTTP service (`coincast-server`) and the
//! interactive spreadsheet report tool (`coincast-report`).

pub mod app;
pub mod config;
pub mod errors;
pub mod external;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
