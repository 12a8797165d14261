pub mod action;
pub mod analysis;
pub mod chat;
pub mod coalesce;
pub mod prompt;
pub mod reports;
pub mod structured;
