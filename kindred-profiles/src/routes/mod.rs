pub mod account;
pub mod health;
pub mod likes;
pub mod photo;
pub mod users;
