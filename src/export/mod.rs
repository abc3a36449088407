pub mod backend;
pub mod format;
pub mod link;
pub mod oauth;
