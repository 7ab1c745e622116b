pub mod gateway;
pub mod list;
pub mod log;
pub mod serve;
pub mod status;
