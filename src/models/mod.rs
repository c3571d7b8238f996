pub mod booking;
pub mod event;
pub mod ticket;
pub mod user;
