pub mod app;
pub mod config;
pub mod game;
pub mod net;
pub mod plugins;
