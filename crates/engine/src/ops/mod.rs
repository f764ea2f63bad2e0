use sea_orm::DatabaseConnection;

use crate::ResultEngine;

mod access;
mod budgets;
mod categories;
mod store;
mod transactions;
mod users;

pub use transactions::{Balance, CreatedTransaction};
pub use users::PasswordReset;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    bcrypt_cost: u32,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    bcrypt_cost: u32,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Work factor used when hashing passwords (clamped to bcrypt's valid
    /// range). Tests use the minimum to stay fast.
    pub fn bcrypt_cost(mut self, cost: u32) -> EngineBuilder {
        self.bcrypt_cost = cost.clamp(4, 31);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            bcrypt_cost: self.bcrypt_cost,
        })
    }
}
