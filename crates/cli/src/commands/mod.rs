pub mod config_cmd;
pub mod doctor;
pub mod run;
pub mod runtime;
pub mod todos;
