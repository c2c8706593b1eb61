pub mod subscription;
pub mod token;
pub mod user;
