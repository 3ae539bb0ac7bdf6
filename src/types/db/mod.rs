// Database entities - SeaORM models

pub mod role;
pub mod social_media_profile;
pub mod user;
pub mod user_role;
