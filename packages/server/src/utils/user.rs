use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::entity::{user, user_skill};
use crate::error::AppError;

/// Look up a user by ID, returning 404 if not found.
pub async fn find_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Map user IDs to usernames. Unknown IDs are absent from the map.
pub async fn usernames<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, String>, AppError> {
    let ids: Vec<i32> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i32, String)> = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .select_only()
        .column(user::Column::Id)
        .column(user::Column::Username)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().collect())
}

/// Skills for each user, in profile order.
pub async fn skills_by_user<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, Vec<String>>, AppError> {
    let ids: Vec<i32> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = user_skill::Entity::find()
        .filter(user_skill::Column::UserId.is_in(ids))
        .order_by_asc(user_skill::Column::UserId)
        .order_by_asc(user_skill::Column::Position)
        .all(db)
        .await?;

    let mut map: HashMap<i32, Vec<String>> = HashMap::new();
    for row in rows {
        map.entry(row.user_id).or_default().push(row.skill);
    }
    Ok(map)
}

pub async fn skills_of<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<String>, AppError> {
    Ok(skills_by_user(db, [user_id])
        .await?
        .remove(&user_id)
        .unwrap_or_default())
}

/// Replace a user's skill list.
pub async fn replace_skills<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    skills: &[String],
) -> Result<(), AppError> {
    user_skill::Entity::delete_many()
        .filter(user_skill::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    if skills.is_empty() {
        return Ok(());
    }

    let rows = skills
        .iter()
        .enumerate()
        .map(|(i, skill)| -> Result<user_skill::ActiveModel, AppError> {
            Ok(user_skill::ActiveModel {
                user_id: sea_orm::Set(user_id),
                skill: sea_orm::Set(skill.clone()),
                position: sea_orm::Set(
                    i32::try_from(i).map_err(|_| AppError::Validation("Too many skills".into()))?,
                ),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    user_skill::Entity::insert_many(rows).exec(db).await?;
    Ok(())
}
