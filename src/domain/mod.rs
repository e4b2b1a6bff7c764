pub mod filter;
pub mod product;
pub mod product_validation;
