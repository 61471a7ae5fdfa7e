pub mod content;
pub mod parse;
