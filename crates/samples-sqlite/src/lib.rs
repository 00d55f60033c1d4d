mod open;
mod models;
mod insert;
mod query;
mod schema;
mod arrow_schemas;
mod export_parquet;

pub use open::Db;
pub use models::*;
pub use export_parquet::export_samples_to_parquet;
