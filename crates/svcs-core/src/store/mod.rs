pub mod canonical;
pub mod config;
pub mod objects;
pub mod repository;
