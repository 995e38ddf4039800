//! ctxbench-backend: adapters implementing the generation boundary.

pub mod http;
pub mod sim;

pub use http::HttpBackend;
pub use sim::{SimBackend, SimProfile};
