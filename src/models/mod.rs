pub mod endpoint;
pub mod response;
