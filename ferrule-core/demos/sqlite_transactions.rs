use ferrule_core::executor::SqlxPool;
use ferrule_core::{
    AuditHooks, Database, Entity, EntityDescriptor, Field, KeyStrategy, Predicate, Settings,
    Statement, UpdateOptions,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    id: i64,
    owner: String,
    balance: i64,
    version: i32,
}

impl Account {
    const ID: Field<Account, i64> = Field::new("id");
    const OWNER: Field<Account, String> = Field::new("owner");
    const BALANCE: Field<Account, i64> = Field::new("balance");
    const VERSION: Field<Account, i32> = Field::new("version");
}

impl Entity for Account {
    fn descriptor() -> EntityDescriptor<Self> {
        EntityDescriptor::new()
            .table("accounts")
            .id_with(Self::ID, KeyStrategy::Snowflake)
            .field(Self::OWNER)
            .field(Self::BALANCE)
            .field(Self::VERSION)
    }
}

fn account(owner: &str, balance: i64) -> Account {
    Account {
        id: 0,
        owner: owner.to_string(),
        balance,
        version: 1,
    }
}

#[tokio::main]
async fn main() -> ferrule_core::Result<()> {
    let settings = Settings::builder()
        .optimistic_lock(ferrule_core::OptimisticLock::enable("version"))
        .audit(AuditHooks::new().after(|sql, params, elapsed_ms| {
            println!("   [{} ms] {} {:?}", elapsed_ms, sql, params);
        }))
        .build()?;

    // a single connection keeps the in-memory database alive between statements
    let pool = SqlxPool::from_pool(
        sqlx::pool::PoolOptions::<sqlx::Any>::new()
            .max_connections(1)
            .connect({
                sqlx::any::install_default_drivers();
                "sqlite::memory:"
            })
            .await?,
    );
    let db = Database::new(pool, Arc::new(settings));

    db.execute(&Statement::new(
        "create table accounts (id integer primary key, owner text, balance integer, version integer)",
        vec![],
    ))
    .await?;

    println!("1. Batch insert");
    let inserted = db
        .insert_batch(&[account("alice", 100), account("bob", 50), account("carol", 75)])
        .await?;
    println!("   inserted {} rows", inserted);

    println!("2. Transfer inside a transaction");
    db.transaction(|tx| {
        Box::pin(async move {
            let select = tx.select().where_(Account::OWNER.eq("alice"));
            let mut alice = tx
                .query_one::<Account>(select)
                .await?
                .ok_or_else(|| ferrule_core::Error::invalid_input("alice is missing"))?;
            alice.balance -= 30;
            tx.update_by_id(&alice, UpdateOptions::default()).await?;
            Ok(())
        })
    })
    .await?;

    println!("3. Streaming rich accounts");
    let mut stream = db
        .query_stream::<Account>(db.select().where_(Account::BALANCE.gt(60i64)))
        .await?;
    while let Some(account) = stream.next().await {
        let account = account?;
        println!("   {} has {} (version {})", account.owner, account.balance, account.version);
    }

    println!("4. Pagination");
    let page = db
        .paginate::<Account>(db.select().order_by_asc(Account::OWNER), 1, 2)
        .await?;
    println!(
        "   page {}/{} with {} of {} rows",
        page.page_number,
        page.total_page,
        page.records.len(),
        page.total_row
    );

    Ok(())
}
