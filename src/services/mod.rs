//! Business logic. Handlers stay thin and delegate here.

pub mod auth;
pub mod contacts;

pub use auth::AuthService;
pub use contacts::ContactService;
