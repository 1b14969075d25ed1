pub mod ast;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod knowledge_base;
pub mod lang;
pub mod parser;
pub mod scanner;
pub mod sink;
pub mod unify;

pub use config::Config;
pub use error::TsilError;
pub use lang::{RunReport, Tsil};
