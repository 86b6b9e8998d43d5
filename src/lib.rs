pub mod ai;
pub mod api;
pub mod assist;
pub mod chat;
pub mod cli;
pub mod core;
pub mod email;
pub mod google;
pub mod openai;
pub mod store;
