pub mod action;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod gateway;
pub mod interpret;
pub mod modal;
pub mod notice;
pub mod paths;
pub mod refresh;
pub mod registry;

pub use error::{InkdeskError, Result};
