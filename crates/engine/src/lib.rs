//! Domain engine of the finance tracker.
//!
//! The engine owns the data model (users, categories, income/expense
//! transactions, budgets), the sea-orm entities that persist it and the two
//! pieces of domain logic the rest of the system builds on:
//!
//! - [`recurrence`]: expansion of a recurring transaction into its series.
//! - [`budgets`]: evaluation of a budget against the matching expenses.
//!
//! Every [`Engine`] operation takes the requesting user's id and only ever
//! sees that user's rows.

pub use budgets::{Budget, BudgetReport, BudgetStatus, BudgetWarning, evaluate};
pub use categories::Category;
pub use commands::{
    BudgetFilter, BudgetOrderField, BudgetOrdering, BudgetUpdateCmd, CategoryUpdateCmd,
    NewBudgetCmd, NewCategoryCmd, NewTransactionCmd, NewUserCmd, ProfileUpdateCmd,
    TransactionFilter, TransactionUpdateCmd,
};
pub use error::EngineError;
pub use money::MoneyCents;
pub use ops::{Balance, CreatedTransaction, Engine, EngineBuilder, PasswordReset};
pub use recurrence::{MAX_RECURRENCE_COUNT, Recurrence, RecurrenceType, expand, extend_series};
pub use store::TransactionStore;
pub use transactions::{Transaction, TransactionKind};
pub use users::User;
pub use util::parse_uuid;

pub mod budgets;
pub mod recurrence;

mod categories;
mod commands;
mod error;
mod money;
mod ops;
mod revoked_tokens;
mod store;
mod transactions;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
