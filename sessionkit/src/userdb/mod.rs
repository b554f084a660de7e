mod errors;
mod memory;
mod types;

pub use errors::UserError;
pub use memory::InMemoryUserStore;
pub use types::{User, UserStore};
