pub mod catalog;
pub mod movements;
pub mod stock_levels;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
