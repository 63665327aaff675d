pub mod registry;
pub mod response;
