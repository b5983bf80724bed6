pub mod command_ingress;
pub mod filesystem;
pub mod snapshot;

pub use command_ingress::CommandIngress;
pub use filesystem::FilesystemCollector;
pub use snapshot::SnapshotCollector;
