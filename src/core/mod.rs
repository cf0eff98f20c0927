pub mod config;
pub mod constants;
pub mod controller;
pub mod extent;
pub mod geo;
pub mod projection;
