use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Not unique: only the superadmin role carries a uniqueness constraint.
    pub username: String,

    pub roletype: String,

    pub email: String,

    /// Password digest (argon2 PHC string or legacy SHA-256 hex)
    pub password: String,

    pub company_id: Option<String>,

    pub experience_years: Option<i32>,

    pub is_active: bool,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
