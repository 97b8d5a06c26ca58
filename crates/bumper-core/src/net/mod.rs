pub mod close_codes;
pub mod messages;
pub mod protocol;
