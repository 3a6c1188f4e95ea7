#![forbid(unsafe_code)]

pub mod calculators;
pub mod events;
pub mod import;
pub mod model;
pub mod time;

pub use time::Clock;
