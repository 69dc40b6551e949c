//! Input dispatch and error handling for terminal views.

pub mod config;
pub mod error;
pub mod event;
pub mod view;

#[cfg(test)]
mod testing;
