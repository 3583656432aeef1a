pub mod chains;
pub mod users;
