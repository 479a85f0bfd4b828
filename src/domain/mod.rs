mod account;
mod category;
mod date;
mod ledger;
mod money;
mod transaction;

pub use account::*;
pub use category::{
    build_category_tree, creates_cycle, root_of, Category, CategoryCode, CategoryNode,
};
pub use date::*;
pub use ledger::*;
pub use money::*;
pub use transaction::*;
