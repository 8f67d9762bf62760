//! Command implementations.

pub mod build;
pub mod check;
pub mod watch;

pub use build::execute as build_execute;
pub use check::execute as check_execute;
pub use watch::execute as watch_execute;
