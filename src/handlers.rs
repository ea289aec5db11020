pub mod auth;
pub mod author;
pub mod categories;
pub mod favourites;
pub mod health;
pub mod home;
pub mod offers;
pub mod products;
pub mod profile;
pub mod reader;
