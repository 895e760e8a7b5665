pub mod health;
pub mod lock;
pub mod model;
pub mod route;
