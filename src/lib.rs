pub mod config;
pub mod controller;
pub mod input;
pub mod mapping;
pub mod shell;
