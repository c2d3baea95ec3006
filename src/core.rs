// Authors: Robert Lopez

pub mod bucket;
pub mod get;
pub mod pagination_iter;
pub mod upload;
