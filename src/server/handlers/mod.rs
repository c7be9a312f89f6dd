pub mod account;
pub mod categories;
pub mod health;
pub mod layers;
pub mod permissions;
pub mod upload;
