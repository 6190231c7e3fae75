pub mod entities;
pub mod errors;
pub mod foreign_link;
pub mod workflow;
