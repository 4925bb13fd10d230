pub mod settings;

pub use settings::{
    BehaviorConfig, CacheConfig, Config, ConfigError, GitConfig, DEFAULT_COMMAND_LOG_CAPACITY,
};
