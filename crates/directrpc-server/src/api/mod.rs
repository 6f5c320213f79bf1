pub mod cache;
pub mod model;


pub use cache::{ApiCacheKey, ApiDescriptorCache};
pub use model::{Action, PollingProvider, RemotingApi};
