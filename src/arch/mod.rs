// Platform support
pub mod x86_64;
