pub mod hours_parser;
pub mod session_classifier;
