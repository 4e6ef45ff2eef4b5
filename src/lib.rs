pub mod canned;
pub mod cli;
pub mod http;
pub mod response_buffer;
pub mod server;
