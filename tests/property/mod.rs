//! Property-based tests for chunking and hashing guarantees

mod chunking;
mod hashing;
mod scheduling;
