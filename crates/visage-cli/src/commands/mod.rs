pub mod config;
pub mod recognize;
pub mod register;
pub mod status;
pub mod users;

pub use recognize::run_recognize;
pub use register::run_register;
pub use status::show_status;
