use sea_orm::entity::prelude::*;

/// The role assigned to newly registered users.
pub const DEFAULT_ROLE: &str = "participant";

/// Roles a user may pick for themselves at registration.
pub const SELF_SERVICE_ROLES: &[&str] = &["participant", "organizer"];

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "role")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,

    #[sea_orm(has_many)]
    pub permissions: HasMany<super::role_permission::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
