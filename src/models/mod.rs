mod chain_of_command;
mod user;

pub use chain_of_command::ChainOfCommand;
pub use user::User;
