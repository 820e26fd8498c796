//! Test modules for the SEDA queue and consumer pool

mod shutdown;
