pub mod error;
pub mod filter;
pub mod requests;
pub mod responses;
pub mod store;


pub use error::{DirectError, ErrorKind, Result};
pub use filter::{Comparison, Filter};
pub use requests::{CallEnvelope, Tid, RPC_CALL_TYPE};
pub use responses::DirectResponse;
pub use store::{GroupInfo, SortDirection, SortInfo, StoreReadRequest};
