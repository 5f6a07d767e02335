//! Storage for the procura catalog and session state: repository traits,
//! in-memory providers, and the sqlite-backed product catalog.

pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use repositories::{
    InMemoryProductRepository, InMemorySessionStore, ProductRepository, RepositoryError,
    SessionStore, SqlProductRepository,
};
