//! `SeaORM` Entity for transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::TransactionKind;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Uuid,
    /// Signed amount in the account's native minor units.
    pub amount: i64,
    /// Signed amount in the user's reference-currency minor units.
    pub ref_amount: i64,
    pub kind: TransactionKind,
    /// Ledger date used for balance ordering.
    pub occurred_on: Date,
    /// Shared by the two legs of a transfer, null otherwise.
    pub transfer_id: Option<Uuid>,
    pub external_ref: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Converts the row into the domain record.
    #[must_use]
    pub fn to_record(&self) -> tally_core::ledger::TransactionRecord {
        tally_core::ledger::TransactionRecord {
            id: tally_shared::types::TransactionId::from_uuid(self.id),
            user_id: tally_shared::types::UserId::from_uuid(self.user_id),
            account_id: tally_shared::types::AccountId::from_uuid(self.account_id),
            amount: self.amount,
            ref_amount: self.ref_amount,
            kind: self.kind.clone().into(),
            occurred_on: self.occurred_on,
            transfer_id: self
                .transfer_id
                .map(tally_shared::types::TransferId::from_uuid),
            external_ref: self.external_ref.clone(),
            note: self.note.clone(),
        }
    }
}
