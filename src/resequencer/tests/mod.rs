//! Test modules for the stream resequencer
//!
//! Organised by behaviour: ordering of contiguous runs, gap timeouts,
//! capacity backpressure and lifecycle/stop handling.
