pub mod config;
pub mod gateway;
pub mod handler;
pub mod routes;
