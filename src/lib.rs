//! # SAKINA Marketplace Library
//!
//! Core of the SAKINA hotel-bidding marketplace: travel agencies submit
//! accommodation requests, hotel providers bid on them, administrators apply
//! a margin and confirm the winning bid.

pub mod auth;
pub mod bidding;
pub mod config;
pub mod cursor;
pub mod db;
pub mod error;
pub mod handlers;
pub mod invoicing;
pub mod models;
pub mod pricing;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod telemetry;
pub use migration;
