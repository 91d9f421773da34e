pub mod app;
pub mod catalog;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod place;
pub mod policy;
pub mod runtime;
pub mod simulate;

pub use app::run;
pub use env::CliArgs;
