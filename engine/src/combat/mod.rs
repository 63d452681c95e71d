pub mod luck;
pub mod session;
