pub mod agent;
pub mod conversation;
pub mod errors;
pub mod knowledge;
pub mod leads;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod slots;
pub mod tools;
