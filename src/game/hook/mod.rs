pub mod effect;
pub mod indicator;
pub mod machine;
pub mod phase;
pub mod systems;
pub mod target;
