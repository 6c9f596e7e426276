pub mod assets;
pub mod multipart;
