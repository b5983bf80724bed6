pub mod backends;
pub mod host;
pub mod runner;

pub use host::ServiceHost;
pub use runner::HostRunner;
