use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Users::Username).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::Email).string().null())
                    .col(ColumnDef::new(Users::EmailConfirmed).boolean().not_null().default(false))
                    .col(ColumnDef::new(Users::PhoneNumber).string().null())
                    .col(ColumnDef::new(Users::PasswordHash).string().null())
                    .col(ColumnDef::new(Users::AccessFailedCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Users::LockoutEnd).big_integer().null())
                    .col(ColumnDef::new(Users::TwoFactorEnabled).boolean().not_null().default(false))
                    .col(ColumnDef::new(Users::ResetTokenHash).string().null())
                    .col(ColumnDef::new(Users::ResetTokenExpiresAt).big_integer().null())
                    .col(ColumnDef::new(Users::ConfirmTokenHash).string().null())
                    .col(ColumnDef::new(Users::ConfirmTokenExpiresAt).big_integer().null())
                    .col(ColumnDef::new(Users::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .to_owned(),
            )
            .await?;

        // Create roles table
        manager
            .create_table(
                Table::create()
                    .table(Roles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Roles::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Roles::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(Roles::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Create user_roles join table
        manager
            .create_table(
                Table::create()
                    .table(UserRoles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserRoles::UserId).string().not_null())
                    .col(ColumnDef::new(UserRoles::RoleId).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(UserRoles::UserId)
                            .col(UserRoles::RoleId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_roles_user_id")
                            .from(UserRoles::Table, UserRoles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_roles_role_id")
                            .from(UserRoles::Table, UserRoles::RoleId)
                            .to(Roles::Table, Roles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create social_media_profiles table
        manager
            .create_table(
                Table::create()
                    .table(SocialMediaProfiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SocialMediaProfiles::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(SocialMediaProfiles::UserId).string().not_null())
                    .col(ColumnDef::new(SocialMediaProfiles::Provider).string().not_null())
                    .col(ColumnDef::new(SocialMediaProfiles::ProviderUserId).string().not_null())
                    .col(ColumnDef::new(SocialMediaProfiles::Name).string().not_null())
                    .col(ColumnDef::new(SocialMediaProfiles::Email).string().not_null())
                    .col(ColumnDef::new(SocialMediaProfiles::ProfilePictureUrl).string().null())
                    .col(ColumnDef::new(SocialMediaProfiles::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_social_media_profiles_user_id")
                            .from(SocialMediaProfiles::Table, SocialMediaProfiles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_social_media_profiles_user_id")
                    .table(SocialMediaProfiles::Table)
                    .col(SocialMediaProfiles::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SocialMediaProfiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserRoles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Roles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    EmailConfirmed,
    PhoneNumber,
    PasswordHash,
    AccessFailedCount,
    LockoutEnd,
    TwoFactorEnabled,
    ResetTokenHash,
    ResetTokenExpiresAt,
    ConfirmTokenHash,
    ConfirmTokenExpiresAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Roles {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum UserRoles {
    Table,
    UserId,
    RoleId,
}

#[derive(DeriveIden)]
enum SocialMediaProfiles {
    Table,
    Id,
    UserId,
    Provider,
    ProviderUserId,
    Name,
    Email,
    ProfilePictureUrl,
    CreatedAt,
}
