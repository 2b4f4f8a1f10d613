pub mod category;
pub mod collection;
pub mod collection_product;
pub mod product;
