use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub customer_email: String,
    pub customer_name: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_country: String,
    pub shipping_postal_code: String,
    pub subtotal: i64,
    pub discount_amount: i64,
    pub promo_code: Option<String>,
    pub shipping_cost: i64,
    pub tax_amount: i64,
    pub total: i64,
    pub status: String,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub payment_method: String,
    pub payment_reference: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
