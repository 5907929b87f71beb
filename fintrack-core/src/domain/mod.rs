//! Core domain entities
//!
//! Pure data structures with validation logic. No I/O.

mod budget;
mod category;
pub mod money;
pub mod period;
pub mod report;
pub mod result;
mod transaction;
mod user;

pub use budget::{Budget, BudgetCategoryRef};
pub use category::{Category, CategoryKind};
pub use period::{DateInterval, PeriodResolution};
pub use report::{
    BreakdownPayload, BudgetStatus, BudgetSummary, CategoryOption, CategoryTotal,
    MonthlyAggregate, PeriodInfo, PeriodReport, ReportPayload, ReportWarning,
};
pub use transaction::Transaction;
pub use user::User;
