pub mod image;
pub(crate) mod json;
pub mod retry;
pub mod time;
