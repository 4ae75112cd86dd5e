pub mod client;
pub mod token;

pub use client::{DropboxClient, DropboxConfig};
pub use token::refresh_access_token;
