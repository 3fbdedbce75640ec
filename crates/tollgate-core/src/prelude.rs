pub use tollgate_types::error::{Error, TgResult};
pub use tollgate_types::types::{Classification, ClientId};

pub use tracing::{debug, error, info, trace, warn};

// vim: ts=4
