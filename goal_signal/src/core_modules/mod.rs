pub mod color;
pub mod detector;
pub mod layout;
pub mod receiver;
pub mod region;
pub mod robot_link;
pub mod tuning;
