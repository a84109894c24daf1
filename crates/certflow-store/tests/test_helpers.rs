use certflow_store::{connect, setup_schema, StoreError};
use certflow_types::{Event, EventMetadata};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// 创建测试用的内存 SQLite 数据库
pub async fn create_test_db() -> Result<Arc<DatabaseConnection>, StoreError> {
    let db = connect("sqlite::memory:").await?;
    setup_schema(&db).await?;
    Ok(Arc::new(db))
}

/// 创建测试活动
pub fn create_test_event(owner_id: &str) -> Event {
    Event::new(
        owner_id,
        "certificate.png",
        r#"[{"id":"f1","key":"name","x":0.5,"y":0.5,"fontSize":0.04}]"#,
        EventMetadata {
            name: "Rust Workshop".to_string(),
            organization: None,
            date: None,
        },
    )
}
