use common::Role;
use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder, SqliteQueryBuilder};
use sea_orm::*;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::entity::{event, rsvp, user};
use crate::models::auth::normalize_email;

/// Promote the configured bootstrap account to admin if it already exists.
/// Accounts registered later get the role at registration time.
pub async fn promote_bootstrap_admin(db: &DatabaseConnection, config: &AuthConfig) -> Result<(), DbErr> {
    let Some(email) = config.bootstrap_admin_email.as_deref().map(normalize_email) else {
        return Ok(());
    };
    if email.is_empty() {
        return Ok(());
    }

    let Some(existing) = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(db)
        .await?
    else {
        info!(email = %email, "Bootstrap admin not registered yet");
        return Ok(());
    };

    if existing.role == Role::Admin {
        return Ok(());
    }

    let mut active: user::ActiveModel = existing.into();
    active.role = Set(Role::Admin);
    active.committee_position = Set(None);
    active.update(db).await?;
    info!(email = %email, "Promoted bootstrap account to admin");
    Ok(())
}

/// Ensure the composite indexes schema-sync does not create.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Going counts: SELECT event_id, COUNT(*) FROM rsvp WHERE status = ? GROUP BY event_id
    let rsvp_status = Index::create()
        .if_not_exists()
        .name("idx_rsvp_event_status")
        .table(rsvp::Entity)
        .col(rsvp::Column::EventId)
        .col(rsvp::Column::Status)
        .to_owned();
    create_index(db, "idx_rsvp_event_status", &rsvp_status).await;

    // Ownership check before deleting a user.
    let event_owner = Index::create()
        .if_not_exists()
        .name("idx_event_created_by")
        .table(event::Entity)
        .col(event::Column::CreatedBy)
        .to_owned();
    create_index(db, "idx_event_created_by", &event_owner).await;

    Ok(())
}

async fn create_index(db: &DatabaseConnection, name: &str, stmt: &IndexCreateStatement) {
    let sql = match db.get_database_backend() {
        DbBackend::Postgres => stmt.to_string(PostgresQueryBuilder),
        _ => stmt.to_string(SqliteQueryBuilder),
    };

    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => warn!("Failed to create index {}: {}", name, e),
    }
}
