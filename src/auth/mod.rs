pub mod credentials;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod sessions;
pub mod validators;


pub use routes::auth_routes;
