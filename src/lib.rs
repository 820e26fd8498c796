pub mod app;
pub mod core;
pub mod exchange;
pub mod repository;
pub mod resequencer;
pub mod seda;
pub mod trace;
