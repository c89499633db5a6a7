pub mod db;

pub use db::connectors::{CatalogAccess, ConnectionConfig, Dialect};
pub use db::schema::{ArrayElementInfo, ColumnAddress, ColumnInfo};
pub use db::type_resolver::{ResolveError, ResolvedType, ResolverOptions, ScalarType, TypeResolver};

/// Install the `env_logger` backend for the `log` facade.
///
/// Defaults to `info`; `RUST_LOG` overrides it. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}
