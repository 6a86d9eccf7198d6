pub mod edge_trust;

pub use edge_trust::{EdgeTrustMiddleware, DEFAULT_PUBLIC_PATHS};
