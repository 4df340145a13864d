pub mod serve;
pub mod status;
