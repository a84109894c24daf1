use crate::db::{event, participant, participation};
use crate::error::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info};

/// 建立数据库连接
///
/// 内存 SQLite 每个连接都是独立的库，因此连接池限制为 1。
pub async fn connect(url: &str) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(url.to_string());
    if url.starts_with("sqlite") && url.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    }
    options.sqlx_logging(false);

    let db = Database::connect(options).await?;
    info!(url = %redact(url), "Database connected");
    Ok(db)
}

/// 根据实体创建表结构与索引（幂等）
pub async fn setup_schema(db: &DatabaseConnection) -> Result<()> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let events = schema
        .create_table_from_entity(event::Entity)
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&events)).await?;

    let participants = schema
        .create_table_from_entity(participant::Entity)
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&participants)).await?;

    let participations = schema
        .create_table_from_entity(participation::Entity)
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&participations)).await?;

    // 每个 (活动, 参与者) 只有一条记录
    let unique_pair = Index::create()
        .name("idx_participations_event_participant")
        .table(participation::Entity)
        .col(participation::Column::EventId)
        .col(participation::Column::ParticipantId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&unique_pair)).await?;

    // 参与者按 (owner, email) 去重
    let unique_email = Index::create()
        .name("idx_participants_owner_email")
        .table(participant::Entity)
        .col(participant::Column::OwnerId)
        .col(participant::Column::Email)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&unique_email)).await?;

    let by_status = Index::create()
        .name("idx_participations_event_status")
        .table(participation::Entity)
        .col(participation::Column::EventId)
        .col(participation::Column::GenerationStatus)
        .col(participation::Column::DeliveryStatus)
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&by_status)).await?;

    debug!("Database schema ready");
    Ok(())
}

fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
