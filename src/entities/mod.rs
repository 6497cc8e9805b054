pub mod category;
pub mod order;
pub mod order_item;
pub mod product;
pub mod session;
pub mod user;

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Schema,
    Set, TransactionTrait,
};

use crate::config::AppConfig;
use crate::entities::{
    category::Entity as Category, order::Entity as Order, order_item::Entity as OrderItem,
    product::Entity as Product, session::Entity as Session, user::Entity as User,
};

pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = vec![
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Category),
        schema.create_table_from_entity(Product),
        schema.create_table_from_entity(Order),
        schema.create_table_from_entity(OrderItem),
        schema.create_table_from_entity(Session),
    ];

    for statement in statements.iter_mut() {
        statement.if_not_exists();
        db.execute(backend.build(&*statement)).await?;
    }

    let mut indexes = schema.create_index_from_entity(Order);
    indexes.extend(schema.create_index_from_entity(OrderItem));
    for index in indexes.iter_mut() {
        index.if_not_exists();
        db.execute(backend.build(&*index)).await?;
    }

    Ok(())
}

/// Seeds the `admin` and `user` accounts when their passwords are configured
/// and the usernames are still free.
pub async fn primary_settup(db: &DatabaseConnection, config: &AppConfig) -> Result<(), DbErr> {
    let accounts = [
        ("admin", config.admin_password.as_deref(), user::Role::Admin),
        ("user", config.user_password.as_deref(), user::Role::User),
    ];

    let txn = db.begin().await?;
    for (username, password, role) in accounts {
        let Some(password) = password else {
            continue;
        };

        let existing = User::find()
            .filter(user::Column::Username.eq(username))
            .one(&txn)
            .await?;
        if existing.is_some() {
            continue;
        }

        let password_hash = user::hash_password(password).map_err(DbErr::Custom)?;
        let new_user = user::ActiveModel {
            username: Set(username.to_owned()),
            password: Set(password_hash),
            role: Set(role),
            ..Default::default()
        };
        User::insert(new_user).exec(&txn).await?;
        tracing::info!(username, role = %role, "Seeded account");
    }
    txn.commit().await
}
