pub mod actions;
pub mod clients;
pub mod command;
pub mod dispatch;
pub mod events;
pub mod modals;
pub mod notices;
pub mod ui_events;
