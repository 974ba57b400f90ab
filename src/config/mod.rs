pub mod proc_loader;
pub mod proc_validator;
pub mod provider;
pub mod settings;
pub mod types;
