use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "product_variants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub size_id: Uuid,
    pub color_id: Uuid,
    pub stock_quantity: i32,
    pub price_adjustment: i64,
    pub is_available: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id"
    )]
    Products,
    #[sea_orm(
        belongs_to = "super::product_sizes::Entity",
        from = "Column::SizeId",
        to = "super::product_sizes::Column::Id"
    )]
    ProductSizes,
    #[sea_orm(
        belongs_to = "super::product_colors::Entity",
        from = "Column::ColorId",
        to = "super::product_colors::Column::Id"
    )]
    ProductColors,
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::product_sizes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductSizes.def()
    }
}

impl Related<super::product_colors::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductColors.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
