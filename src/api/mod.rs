pub mod account;
pub mod middleware;
pub mod models;
pub mod relay;
pub mod routes;
