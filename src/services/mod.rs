pub mod day_status;
pub mod fill;
pub mod generator;
pub mod holidays;
pub mod layout;
pub mod openai;
pub mod outdated;
pub mod state;
pub mod work_records;
