pub mod fetch;
pub mod serve;
pub mod show;
pub mod status;
