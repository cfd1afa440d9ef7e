pub mod account;
pub mod models;
pub mod predictions;
