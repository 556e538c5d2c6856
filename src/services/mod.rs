pub mod get_quote;
pub mod place_order;
