pub mod assembler;
pub mod config;
pub mod error;
pub mod identity;
pub mod local_source;
pub mod maps;
pub mod media;
pub mod tags;

pub use assembler::{IngestOutcome, ReplayIngestor, StoredFile, Upload};
pub use config::{AppConfig, ConfigError};
pub use error::{IngestError, MapSourceError};
pub use local_source::LocalMapSource;
pub use maps::{register_map, MapSource, NoopMapSource};
