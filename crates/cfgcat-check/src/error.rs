use cfgcat_model::{CatalogError, ObjectId};

/// Faults that abort a phase. The engine turns them into a single
/// `check.internal` finding instead of propagating them to the caller.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("required system data missing: {0}")]
    MissingSystemData(String),

    #[error("pinned area {0} is unknown to the catalog")]
    UnknownPinnedArea(ObjectId),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
