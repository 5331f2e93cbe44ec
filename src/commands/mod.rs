pub mod batch;
pub mod extract;
pub mod import;
pub mod status;
pub mod validate;
