//! Shared storage integration tests.
//!
//! Tests the BookingStore interface against all implementations.
//! Each implementation module imports these test functions and runs them.

pub mod booking_store_tests;
