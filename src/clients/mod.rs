//! External service clients.

pub mod gst;

pub use gst::GstServiceClient;
