pub mod artifact_port;
pub mod command_port;
pub mod database_port;
