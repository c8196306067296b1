pub mod app;
pub mod info;
pub mod items;
pub mod messages;
pub mod stats;
