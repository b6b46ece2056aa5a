pub mod coordinator;
pub mod handlers;
pub mod routes;


pub use routes::account_routes;
