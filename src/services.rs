pub mod chat;
pub mod dashboard;
pub mod employees;
pub mod groups;
pub mod lookup;
pub mod planner;
pub mod reminder;
pub mod reports;
pub mod search;
pub mod session;
pub mod tasks;
