use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub username: String,
    pub email: Option<String>,
    pub email_confirmed: bool,
    pub phone_number: Option<String>,

    // Absent for federated accounts created without a password
    pub password_hash: Option<String>,

    // Lockout state, mutated only by the sign-in check
    pub access_failed_count: i32,
    pub lockout_end: Option<i64>,

    pub two_factor_enabled: bool,

    // Single-purpose token state (only the HMAC hash is stored)
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<i64>,
    pub confirm_token_hash: Option<String>,
    pub confirm_token_expires_at: Option<i64>,

    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::social_media_profile::Entity")]
    SocialMediaProfiles,
    #[sea_orm(has_many = "super::user_role::Entity")]
    UserRoles,
}

impl Related<super::social_media_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SocialMediaProfiles.def()
    }
}

impl Related<super::user_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserRoles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
