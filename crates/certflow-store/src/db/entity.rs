use chrono::{DateTime as ChronoDateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 活动实体
pub mod event {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "events")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub owner_id: String,
        pub template_ref: String,
        #[sea_orm(column_type = "Text")]
        pub field_layout: String,
        pub name: String,
        pub organization: Option<String>,
        pub event_date: Option<NaiveDate>,
        pub created_at: ChronoDateTime<Utc>,
        pub updated_at: ChronoDateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::participation::Entity")]
        Participation,
    }

    impl Related<super::participation::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Participation.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// 参与者实体
pub mod participant {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "participants")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub owner_id: String,
        pub name: String,
        pub email: String,
        pub custom_data: Option<Json>,
        pub created_at: ChronoDateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::participation::Entity")]
        Participation,
    }

    impl Related<super::participation::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Participation.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// 活动参与记录实体
pub mod participation {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "event_participations")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub event_id: String,
        pub participant_id: String,
        #[sea_orm(unique)]
        pub certificate_id: String,
        pub generation_status: String,
        pub delivery_status: String,
        pub document_path: Option<String>,
        #[sea_orm(column_type = "Text", nullable)]
        pub generation_error: Option<String>,
        #[sea_orm(column_type = "Text", nullable)]
        pub delivery_error: Option<String>,
        pub delivery_attempts: i32,
        pub created_at: ChronoDateTime<Utc>,
        pub generated_at: Option<ChronoDateTime<Utc>>,
        pub sent_at: Option<ChronoDateTime<Utc>>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::event::Entity",
            from = "Column::EventId",
            to = "super::event::Column::Id",
            on_delete = "Cascade"
        )]
        Event,
        #[sea_orm(
            belongs_to = "super::participant::Entity",
            from = "Column::ParticipantId",
            to = "super::participant::Column::Id"
        )]
        Participant,
    }

    impl Related<super::event::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Event.def()
        }
    }

    impl Related<super::participant::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Participant.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}
