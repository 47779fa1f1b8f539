pub mod error;
pub mod executor;
pub mod session;
pub mod types;

pub use error::ActionError;
pub use executor::ActionExecutor;
pub use session::{BrowserSession, RemoteSession};
pub use types::{ElementHandle, Selector};
