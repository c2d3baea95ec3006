// Authors: Robert Lopez

pub mod upload_object;
pub mod util;
