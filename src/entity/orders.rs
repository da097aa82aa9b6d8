use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Json,
    pub total_amount: i64,
    pub address: Option<Json>,
    pub status: String,
    #[sea_orm(unique)]
    pub payment_txid: String,
    pub payment_method: String,
    pub payment_status: String,
    pub paid_at: DateTimeWithTimeZone,
    pub coupon_code: Option<String>,
    pub discount_amount: Option<i64>,
    pub delivery_estimate: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub payment_confirmed_at: DateTimeWithTimeZone,
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
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
