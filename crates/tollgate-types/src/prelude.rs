pub use crate::error::{Error, TgResult};
pub use crate::types::{Classification, ClientId};

pub use tracing::{debug, error, info, trace, warn};

// vim: ts=4
