pub mod local_storage;
pub mod postgres;
pub mod process;
