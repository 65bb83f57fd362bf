//! Long-running daemon surfaces

pub mod http;
