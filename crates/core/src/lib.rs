#![forbid(unsafe_code)]

pub mod aggregate;
pub mod join;
pub mod model;
pub mod status_control;
pub mod time;

pub use time::Clock;
