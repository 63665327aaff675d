use crate::protocol::{ExtensionPluginResponse, ExtensionResponse, ExtensionStatus};

/// The two outcomes a table call can have, before they become an
/// [`ExtensionResponse`].
pub enum ExtensionResponseEnum {
    /// Status `0 / "OK"` carrying the given rows.
    Success(ExtensionPluginResponse),
    /// Status `1` with the message; no rows.
    Failure(String),
}

impl From<ExtensionResponseEnum> for ExtensionResponse {
    fn from(value: ExtensionResponseEnum) -> Self {
        match value {
            ExtensionResponseEnum::Success(rows) => {
                ExtensionResponse::new(ExtensionStatus::ok(), rows)
            }
            ExtensionResponseEnum::Failure(msg) => {
                ExtensionResponse::new(ExtensionStatus::new(1, msg, None), ExtensionPluginResponse::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_success_response() {
        let row = BTreeMap::from([("status".to_string(), "success".to_string())]);
        let resp: ExtensionResponse = ExtensionResponseEnum::Success(vec![row.clone()]).into();

        assert_eq!(resp.code(), Some(0));
        assert_eq!(resp.message(), Some("OK"));
        assert_eq!(resp.rows(), &[row]);
    }

    #[test]
    fn test_success_without_rows_keeps_empty_list() {
        let resp: ExtensionResponse = ExtensionResponseEnum::Success(vec![]).into();
        assert_eq!(resp.code(), Some(0));
        assert_eq!(resp.response, Some(vec![]));
    }

    #[test]
    fn test_failure_response() {
        let resp: ExtensionResponse =
            ExtensionResponseEnum::Failure("error msg".to_string()).into();

        assert_eq!(resp.code(), Some(1));
        assert_eq!(resp.message(), Some("error msg"));
        assert_eq!(resp.response, Some(vec![]));
    }
}
