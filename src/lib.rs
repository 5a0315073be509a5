mod pages;
mod store;
mod subscription;
mod theme;
mod toggle;

pub use pages::*;
pub use store::{MemoryStore, PreferenceStore, StoreListener, StoreSnapshot};
pub use subscription::*;
pub use theme::*;
pub use toggle::*;
