pub mod db;
pub mod error;
pub mod event;
pub mod participant;
pub mod participation;
pub mod schema;

pub use error::{Result, StoreError};
pub use event::EventRepository;
pub use participant::ParticipantRepository;
pub use participation::{ParticipationRecord, ParticipationRepository};
pub use schema::{connect, setup_schema};

use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// 共享同一连接的全部仓库
#[derive(Clone)]
pub struct Stores {
    pub events: Arc<EventRepository>,
    pub participants: Arc<ParticipantRepository>,
    pub participations: Arc<ParticipationRepository>,
}

impl Stores {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            events: Arc::new(EventRepository::new(db.clone())),
            participants: Arc::new(ParticipantRepository::new(db.clone())),
            participations: Arc::new(ParticipationRepository::new(db)),
        }
    }
}
