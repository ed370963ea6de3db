pub mod client;
pub mod maze;
pub mod profiles;
pub mod ui;
