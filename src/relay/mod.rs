pub mod decode;
pub mod sse;
pub mod upstream;
