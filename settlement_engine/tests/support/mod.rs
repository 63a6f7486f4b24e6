#![allow(dead_code)]
use chrono::{Duration, Utc};
use log::*;
use settlement_engine::{
    db_types::{Costume, NewOrder, NewOrderItem, Order, Role, UserAccount, Vnd},
    OrderManagement,
    SettlementDatabase,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub struct TestWorld {
    pub db: SqliteDatabase,
    pub platform: UserAccount,
    pub owner: UserAccount,
    pub customer: UserAccount,
    /// Rents for 100, sells for 1000
    pub cheap: Costume,
    /// Rents for 200, sells for 2000
    pub fancy: Costume,
}

pub fn random_db_path() -> String {
    let path = std::env::temp_dir().join(format!("settlement_engine_it_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

pub async fn new_db() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = random_db_path();
    Sqlite::create_database(&url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error connecting to database");
    db.migrate().await.expect("Error running migrations");
    debug!("🚀️ Test database ready at {url}");
    db
}

/// A database with a platform account, one collaborator who owns two costumes, and a customer.
pub async fn setup() -> TestWorld {
    let db = new_db().await;
    let platform = db.insert_user_account("Platform", Role::Platform, true).await.unwrap();
    let owner = db.insert_user_account("Lan", Role::Collaborator, true).await.unwrap();
    let customer = db.insert_user_account("Minh", Role::Customer, true).await.unwrap();
    let cheap =
        db.insert_costume(owner.id, "Ao dai", Vnd::from_dong(100), Vnd::from_dong(1000)).await.unwrap();
    let fancy =
        db.insert_costume(owner.id, "Hanbok", Vnd::from_dong(200), Vnd::from_dong(2000)).await.unwrap();
    TestWorld { db, platform, owner, customer, cheap, fancy }
}

pub async fn tear_down(db: SqliteDatabase) {
    let url = db.url().to_string();
    db.close().await;
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Could not drop {url}: {e}");
    }
}

impl TestWorld {
    /// A rental order for one of each costume, totalling 300.
    pub async fn rental_order(&self) -> Order {
        let start = Utc::now() + Duration::days(1);
        let order = NewOrder::new(self.customer.id, vec![
            NewOrderItem::new(self.cheap.id, 1, self.cheap.rental_price),
            NewOrderItem::new(self.fancy.id, 1, self.fancy.rental_price),
        ])
        .with_rental_window(start, start + Duration::days(3));
        self.db.create_order(order).await.unwrap()
    }

    /// A purchase of `qty` cheap costumes at the sale price.
    pub async fn sale_order(&self, qty: i64) -> Order {
        let order = NewOrder::new(self.customer.id, vec![NewOrderItem::new(self.cheap.id, qty, self.cheap.sale_price)]);
        self.db.create_order(order).await.unwrap()
    }
}
