use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

use crate::models::{Participant, ParticipantRole};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "thread_participants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub thread_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    pub role: ParticipantRole,
    pub joined_at: DateTimeWithTimeZone,
    pub last_read_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Participant {
    fn from(model: Model) -> Self {
        Self {
            thread_id: model.thread_id,
            user_id: model.user_id,
            role: model.role,
            joined_at: model.joined_at.into(),
            last_read_at: model.last_read_at.map(Into::into),
        }
    }
}

impl From<&Participant> for ActiveModel {
    fn from(participant: &Participant) -> Self {
        ActiveModel {
            thread_id: Set(participant.thread_id),
            user_id: Set(participant.user_id),
            role: Set(participant.role),
            joined_at: Set(participant.joined_at.into()),
            last_read_at: Set(participant.last_read_at.map(Into::into)),
        }
    }
}
