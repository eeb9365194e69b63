pub mod api;
pub mod backend;
pub mod config;
pub mod database;
pub mod global;
pub mod validation;
pub mod views;

#[cfg(test)]
mod tests;
