pub mod analyzers;
pub mod error;
pub mod figures;
pub mod output;
pub mod parser;
