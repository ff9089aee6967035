pub mod rooms;
pub mod socket;
