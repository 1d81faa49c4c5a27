//! Database seeding
//!
//! Populates the rows the marketplace expects to exist on first start.

pub mod settings;

pub use settings::seed_settings;
