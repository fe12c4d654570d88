//! Engine configuration and command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docref_core::{QueryStyle, StorageConfig};

use crate::cascade::DEFAULT_MAX_CASCADE_DEPTH;

/// Default data directory.
pub const DEFAULT_DATA_PATH: &str = "./docref_data";

/// Default page cache capacity in megabytes.
pub const DEFAULT_CACHE_CAPACITY_MB: u64 = 256;

/// Deletion engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum cascade depth before a deletion fails.
    pub max_cascade_depth: usize,

    /// Selector style used to locate referencing documents.
    pub query_style: QueryStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cascade_depth: DEFAULT_MAX_CASCADE_DEPTH,
            query_style: QueryStyle::Implicit,
        }
    }
}

impl EngineConfig {
    /// Set the maximum cascade depth.
    pub fn with_max_cascade_depth(mut self, depth: usize) -> Self {
        self.max_cascade_depth = depth;
        self
    }

    /// Set the selector style.
    pub fn with_query_style(mut self, style: QueryStyle) -> Self {
        self.query_style = style;
        self
    }
}

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the database directory.
    pub data_path: PathBuf,

    /// Storage settings.
    pub storage: StorageConfig,

    /// Deletion engine settings.
    pub engine: EngineConfig,
}

impl DatabaseConfig {
    /// Create a new configuration with the given data path.
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        let data_path = data_path.into();
        Self {
            storage: StorageConfig::new(&data_path),
            data_path,
            engine: EngineConfig::default(),
        }
    }

    /// Create a temporary in-memory configuration for testing.
    pub fn temporary() -> Self {
        Self {
            data_path: PathBuf::new(),
            storage: StorageConfig::temporary(),
            engine: EngineConfig::default(),
        }
    }

    /// Set the storage configuration.
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Set the engine configuration.
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Check if the database lives only in memory.
    pub fn is_temporary(&self) -> bool {
        self.storage.temporary
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_PATH)
    }
}

/// Command-line arguments for the docref tool.
#[derive(Parser, Debug)]
#[command(name = "docref")]
#[command(version, about = "Referential integrity for document stores", long_about = None)]
pub struct Args {
    /// Path to the database storage directory.
    #[arg(short, long, default_value = DEFAULT_DATA_PATH)]
    pub data_path: PathBuf,

    /// Maximum cascade depth.
    #[arg(long, default_value_t = DEFAULT_MAX_CASCADE_DEPTH)]
    pub max_cascade_depth: usize,

    /// Use explicit element-match selectors instead of implicit array matching.
    #[arg(long)]
    pub explicit_queries: bool,

    /// Page cache capacity in megabytes.
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY_MB)]
    pub cache_capacity_mb: u64,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// docref subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Register every model of a JSON schema file.
    Schema {
        /// Schema file path.
        file: PathBuf,
    },
    /// List compiled references with their live policies.
    Refs {
        /// Only show references to this model.
        #[arg(long)]
        target: Option<String>,
    },
    /// Change the required/cascade flags of a reference field.
    Policy {
        /// Model holding the reference.
        model: String,
        /// Dotted path of the reference field.
        path: String,
        /// Mark the reference as required.
        #[arg(long)]
        required: bool,
        /// Cascade deletions through the reference.
        #[arg(long)]
        cascade: bool,
    },
    /// Insert a document.
    Put {
        /// Model name.
        model: String,
        /// Document body as JSON.
        json: String,
        /// Document identity (generated when omitted).
        #[arg(long)]
        id: Option<String>,
    },
    /// Print a document.
    Get {
        /// Model name.
        model: String,
        /// Document identity.
        id: String,
    },
    /// Hard-delete a document.
    Delete {
        /// Model name.
        model: String,
        /// Document identity.
        id: String,
    },
    /// Soft-delete a document.
    SoftDelete {
        /// Model name.
        model: String,
        /// Document identity.
        id: String,
    },
    /// Restore a soft-deleted document.
    Restore {
        /// Model name.
        model: String,
        /// Document identity.
        id: String,
    },
}

impl Args {
    /// Convert command-line arguments to database configuration.
    pub fn into_config(self) -> (DatabaseConfig, Command) {
        let query_style = if self.explicit_queries {
            QueryStyle::Explicit
        } else {
            QueryStyle::Implicit
        };
        let engine = EngineConfig::default()
            .with_max_cascade_depth(self.max_cascade_depth)
            .with_query_style(query_style);

        let storage = StorageConfig::new(&self.data_path)
            .with_cache_capacity(self.cache_capacity_mb * 1024 * 1024);

        (
            DatabaseConfig::new(self.data_path)
                .with_storage(storage)
                .with_engine(engine),
            self.command,
        )
    }
}
