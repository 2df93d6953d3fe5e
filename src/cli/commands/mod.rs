mod status;

pub use status::cmd_status;
