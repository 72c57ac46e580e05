pub mod chat;
pub mod employee;
pub mod group;
pub mod session;
pub mod store;
pub mod task;
