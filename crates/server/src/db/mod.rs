pub mod boards;
pub mod cards;
pub mod lists;
pub mod users;
pub mod workspaces;
