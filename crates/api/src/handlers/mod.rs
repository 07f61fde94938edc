pub mod health;
pub mod rpc;
