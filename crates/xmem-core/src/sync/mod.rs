//! External source synchronization.

pub mod connector;
pub mod scheduler;
