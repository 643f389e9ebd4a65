pub mod track;
pub mod check;
pub mod watch;
pub mod query;
pub mod extract;
pub mod label;
