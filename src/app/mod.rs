//! Application module

pub mod cli;
pub mod route;
pub mod startup;
