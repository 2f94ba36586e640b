mod profile;
mod quota;
mod session;
mod store;

pub use profile::{IdentityRecord, ProfilePatch, ProfileRecord};
pub use quota::{QuotaAwareSaver, SaveReport, SaveTier};
pub use session::SessionVault;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
