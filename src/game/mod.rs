pub mod collision;
pub mod combat;
pub mod components;
pub mod events;
pub mod hook;
pub mod intent;
pub mod level;
pub mod physics;
pub mod view;
