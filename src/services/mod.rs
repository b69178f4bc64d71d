pub mod backend;
pub mod local_tool;
pub mod media_host;
pub mod pipeline;
pub mod remote;
pub mod replicate;
pub mod storage;
