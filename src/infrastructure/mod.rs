//! Infrastructure layer - transport seam and projection storage

pub mod store;
pub mod transport;
