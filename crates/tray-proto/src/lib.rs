pub mod config;
pub mod platform;
pub mod playlist;
pub mod protocol;
