use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "product_tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub display_name: String,
    pub color: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_tag_assignments::Entity")]
    ProductTagAssignments,
}

impl Related<super::product_tag_assignments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductTagAssignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
