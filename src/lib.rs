pub mod cli;
pub mod command;
pub mod config;
pub mod decode;
pub mod detect;
pub mod error;
pub mod grade;
pub mod output;
pub mod sysfs;
