pub mod base;
pub mod bot;
