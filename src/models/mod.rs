pub mod job;
pub mod separation;
