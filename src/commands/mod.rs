pub mod clients;
pub mod documents;
pub mod months;
pub mod settings;
