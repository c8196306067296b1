pub mod message_repo;
pub mod visit_repo;
