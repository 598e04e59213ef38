pub mod auth;
pub mod category;
pub mod docs;
pub mod favorite;
pub mod model;
pub mod service;
