pub mod anchor;
pub mod layout;
