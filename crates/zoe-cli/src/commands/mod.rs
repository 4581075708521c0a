pub mod check_reallocation;
pub mod config_check;
pub mod quote;
