//! Uniform `{ success, data?, error? }` shape returned to the presentation layer.

use serde::Serialize;

use crate::{ErrorKind, MembershipError};

#[derive(Debug, Serialize)]
pub struct ActionResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl<T> ActionResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
        }
    }

    pub fn err(e: &MembershipError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(e.to_string()),
            error_kind: Some(e.kind()),
        }
    }
}

impl<T> From<Result<T, MembershipError>> for ActionResponse<T> {
    fn from(result: Result<T, MembershipError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(&e),
        }
    }
}
