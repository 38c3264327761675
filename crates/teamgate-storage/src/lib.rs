pub mod memory;
pub mod traits;

pub use memory::{InMemoryStore, StoreOptions};
pub use traits::{ChannelStore, MembershipStore, RoleStore, StorageError, UserStore};
