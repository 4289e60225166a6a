pub mod dashboard;
pub mod redirect;
