pub mod health;
pub mod result;
