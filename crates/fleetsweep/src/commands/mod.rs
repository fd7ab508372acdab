pub mod aws;
pub mod resource_types;
