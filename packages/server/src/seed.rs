use sea_orm::sea_query::{
    Index, IndexCreateStatement, OnConflict, PostgresQueryBuilder, SqliteQueryBuilder,
};
use sea_orm::*;
use tracing::info;

use crate::config::AdminConfig;
use crate::entity::{join_request, role, role_permission, team, team_member, user};
use crate::utils::hash;

/// Default roles seeded on startup.
const DEFAULT_ROLES: &[&str] = &["admin", "organizer", "participant"];

/// Default role-permission mappings seeded on startup.
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    // Admin: all permissions
    ("admin", "hackathon:create"),
    ("admin", "hackathon:manage"),
    ("admin", "user:manage"),
    ("admin", "project:manage"),
    // Organizer
    ("organizer", "hackathon:create"),
];

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Seed roles
    let mut roles_inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(OnConflict::column(role::Column::Name).do_nothing().to_owned())
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => roles_inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    // Seed role-permission mappings
    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => perms_inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

/// Create the configured bootstrap administrator if it does not exist yet.
pub async fn seed_admin(db: &DatabaseConnection, admin: &AdminConfig) -> anyhow::Result<()> {
    let (Some(username), Some(password)) = (&admin.username, &admin.password) else {
        return Ok(());
    };

    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(username.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let email = admin
        .email
        .clone()
        .unwrap_or_else(|| format!("{username}@localhost"));
    let now = chrono::Utc::now();
    user::ActiveModel {
        username: Set(username.clone()),
        email: Set(email.to_lowercase()),
        password: Set(hash::hash_password(password)?),
        role: Set("admin".to_string()),
        display_name: Set(None),
        bio: Set(None),
        github_url: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(%username, "Created bootstrap admin account");
    Ok(())
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-primary indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let indexes = [
        // Team names are unique within a hackathon.
        (
            "idx_team_hackathon_name",
            Index::create()
                .unique()
                .table(team::Entity)
                .col(team::Column::HackathonId)
                .col(team::Column::Name)
                .to_owned(),
        ),
        // Member listing per team.
        (
            "idx_team_member_team",
            Index::create()
                .table(team_member::Entity)
                .col(team_member::Column::TeamId)
                .to_owned(),
        ),
        // Inbox queries: WHERE recipient_id = ? AND status = ?
        (
            "idx_join_request_recipient_status",
            Index::create()
                .table(join_request::Entity)
                .col(join_request::Column::RecipientId)
                .col(join_request::Column::Status)
                .to_owned(),
        ),
        (
            "idx_join_request_sender_status",
            Index::create()
                .table(join_request::Entity)
                .col(join_request::Column::SenderId)
                .col(join_request::Column::Status)
                .to_owned(),
        ),
    ];

    for (name, mut index) in indexes {
        index.if_not_exists().name(name);
        let stmt = build_index(db.get_database_backend(), &index);

        match db.execute_unprepared(&stmt).await {
            Ok(_) => {
                info!("Ensured index {} exists", name);
            }
            Err(e) => {
                tracing::warn!("Failed to create index {}: {}", name, e);
            }
        }
    }

    Ok(())
}

fn build_index(backend: DbBackend, index: &IndexCreateStatement) -> String {
    match backend {
        DbBackend::Sqlite => index.to_string(SqliteQueryBuilder),
        _ => index.to_string(PostgresQueryBuilder),
    }
}
