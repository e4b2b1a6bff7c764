pub mod database;
pub mod gateway;
pub mod product_repository;
pub mod rest_gateway;
pub mod sqlite_gateway;

pub use gateway::{CatalogGateway, DynCatalogGateway};
pub use product_repository::ProductRepository;
pub use rest_gateway::RestGateway;
pub use sqlite_gateway::SqliteGateway;
