//! Response classification shared by the GraphQL and REST paths.

use http::StatusCode;
use serde_json::Value;

use crate::gitlab::error::ErrorKind;

/// Which API produced a response; GraphQL bodies get extra checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `POST /api/graphql`.
    GraphQl,
    /// `/api/v4/...`.
    Rest,
}

/// Outcome of inspecting one HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The payload can be handed to the caller.
    Success,
    /// 429: wait for `Retry-After` and try again if the budget allows.
    RateLimited,
    /// Generic failure that the backoff policy may retry.
    Retryable,
    /// Failure that retrying cannot fix.
    Fatal(ErrorKind),
}

/// Maps a status code and decoded body to a [`Classification`].
#[must_use]
pub fn classify(status: StatusCode, shape: ResponseShape, body: &Value) -> Classification {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Classification::Fatal(ErrorKind::AuthError)
        }
        StatusCode::NOT_FOUND => Classification::Fatal(ErrorKind::NotFound),
        StatusCode::TOO_MANY_REQUESTS => Classification::RateLimited,
        success if success.is_success() => match shape {
            ResponseShape::Rest => Classification::Success,
            ResponseShape::GraphQl if has_graphql_errors(body) || !has_graphql_data(body) => {
                Classification::Fatal(ErrorKind::GraphqlError)
            }
            ResponseShape::GraphQl => Classification::Success,
        },
        _ => Classification::Retryable,
    }
}

fn has_graphql_errors(body: &Value) -> bool {
    body.get("errors")
        .and_then(Value::as_array)
        .is_some_and(|errors| !errors.is_empty())
}

fn has_graphql_data(body: &Value) -> bool {
    body.get("data").is_some_and(|data| !data.is_null())
}

/// Extracts a readable message from a GitLab error body.
///
/// REST errors use `message` (string or object) or `error`; GraphQL errors
/// carry an `errors` array whose messages are joined.
pub(crate) fn error_message(body: &Value) -> Option<String> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        let messages: Vec<&str> = errors
            .iter()
            .filter_map(|error| error.get("message").and_then(Value::as_str))
            .collect();
        if !messages.is_empty() {
            return Some(messages.join("; "));
        }
    }

    match body.get("message") {
        Some(Value::String(message)) => return Some(message.clone()),
        Some(other @ Value::Object(_)) => return Some(other.to_string()),
        _ => {}
    }

    body.get("error")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::{Classification, ResponseShape, classify, error_message};
    use crate::gitlab::error::ErrorKind;

    #[rstest]
    #[case(401, Classification::Fatal(ErrorKind::AuthError))]
    #[case(403, Classification::Fatal(ErrorKind::AuthError))]
    #[case(404, Classification::Fatal(ErrorKind::NotFound))]
    #[case(429, Classification::RateLimited)]
    #[case(500, Classification::Retryable)]
    #[case(502, Classification::Retryable)]
    #[case(409, Classification::Retryable)]
    #[case(200, Classification::Success)]
    fn rest_statuses(#[case] status: u16, #[case] expected: Classification) {
        let code = StatusCode::from_u16(status).expect("status should be valid");
        assert_eq!(classify(code, ResponseShape::Rest, &Value::Null), expected);
    }

    #[rstest]
    #[case::with_data(json!({"data": {"project": null}}), Classification::Success)]
    #[case::missing_data(json!({}), Classification::Fatal(ErrorKind::GraphqlError))]
    #[case::null_data(json!({"data": null}), Classification::Fatal(ErrorKind::GraphqlError))]
    #[case::errors(
        json!({"data": {"project": null}, "errors": [{"message": "boom"}]}),
        Classification::Fatal(ErrorKind::GraphqlError)
    )]
    #[case::empty_errors(json!({"data": {}, "errors": []}), Classification::Success)]
    fn graphql_success_bodies(#[case] body: Value, #[case] expected: Classification) {
        assert_eq!(classify(StatusCode::OK, ResponseShape::GraphQl, &body), expected);
    }

    #[rstest]
    fn graphql_status_failures_take_precedence_over_body() {
        let body = json!({"errors": [{"message": "unauthorised"}]});
        assert_eq!(
            classify(StatusCode::UNAUTHORIZED, ResponseShape::GraphQl, &body),
            Classification::Fatal(ErrorKind::AuthError)
        );
    }

    #[rstest]
    #[case(json!({"message": "401 Unauthorized"}), Some("401 Unauthorized"))]
    #[case(json!({"error": "invalid_token"}), Some("invalid_token"))]
    #[case(json!({"errors": [{"message": "a"}, {"message": "b"}]}), Some("a; b"))]
    #[case(json!({"message": {"title": ["is too long"]}}), Some(r#"{"title":["is too long"]}"#))]
    #[case(json!({"unrelated": true}), None)]
    fn extracts_error_messages(#[case] body: Value, #[case] expected: Option<&str>) {
        assert_eq!(error_message(&body).as_deref(), expected);
    }
}
