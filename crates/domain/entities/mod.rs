pub mod admin_users;
pub mod artworks;
pub mod orders;
