pub mod dast;
pub mod images;
pub mod projects;
