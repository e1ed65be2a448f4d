#![forbid(unsafe_code)]

pub mod calendar;
pub mod schedule;
pub mod status;
