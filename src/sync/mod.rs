pub mod handlers;
pub mod models;
pub mod routes;
pub mod subscriptions;

#[cfg(test)]
mod tests;

pub use routes::sync_routes;
