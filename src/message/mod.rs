//! Parsing of content messages read from the CLI

pub mod parser;

pub use parser::parse_message;
