pub mod game_plugin;
pub mod net_plugin;
