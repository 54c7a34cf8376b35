pub mod db;
pub mod error;
pub mod lots;
pub mod models;
pub mod portfolio;
pub mod prices;
pub mod profile;
pub mod snapshot;
pub mod transactions;

pub use db::PortfolioDb;
pub use error::StoreError;
pub use lots::open_lots;
pub use models::*;
pub use portfolio::PortfolioManager;
pub use prices::{PriceBook, PriceUpdate};
pub use profile::{ProfileRepository, SqliteProfileRepository};
pub use snapshot::{DataSnapshot, ImportReport, SnapshotService, SNAPSHOT_VERSION};
pub use transactions::TransactionLog;
