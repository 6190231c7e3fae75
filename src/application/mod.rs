pub mod foreign_link;
pub mod lifecycle;
pub mod orchestrator;
pub mod progress;
pub mod retry;
pub mod section_dumper;
pub mod section_restorer;
pub mod seeding;
pub mod validation;
