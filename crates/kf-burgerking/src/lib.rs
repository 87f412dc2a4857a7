mod api_interfaces;
pub mod constants;
pub mod error;
pub mod export;
pub mod grid;
pub mod query;
pub mod registry;
pub mod store;
pub mod sweep;
pub mod transport;

pub use query::{QueryExecutor, SearchWindow, WindowResult};
pub use registry::Registry;
pub use store::StoreRecord;
pub use sweep::{SweepConfig, SweepController, SweepSummary};
pub use transport::{HttpTransport, Transport};
