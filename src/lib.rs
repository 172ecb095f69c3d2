pub mod api;
pub mod chat;
pub mod cli;
pub mod client;
pub mod config;
pub mod db;
pub mod email;
pub mod llm;
pub mod sse;
