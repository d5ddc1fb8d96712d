pub mod authority;
pub mod protocol;
pub mod replication;
pub mod role;
pub mod transport;
