pub mod config;

pub use config::{Config, ContainersConfig, ExecutionMode, PathsConfig, RemoteConfig};
