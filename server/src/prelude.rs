pub use tollgate_types::prelude::*;

pub use crate::error::{Error as ApiError, Result as ApiResult};

// vim: ts=4
