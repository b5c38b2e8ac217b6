mod account;
mod credential;
mod money;
mod transaction;

pub use account::*;
pub use credential::*;
pub use money::*;
pub use transaction::*;
