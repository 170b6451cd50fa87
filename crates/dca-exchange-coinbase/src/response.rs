use dca_execution::{ExchangeError, OrderLookup, SubmitOutcome};
use serde_json::Value;

const INSUFFICIENT_FUNDS_MARKER: &str = "insufficient funds";

fn order_id_of(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    match v.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Map a `POST /orders` response to the engine's tagged outcome.
///
/// - 2xx with `id`: accepted
/// - 2xx without `id`: rejected, reason is the raw body
/// - 4xx whose message says insufficient funds: [`ExchangeError::InsufficientFunds`]
/// - anything else: [`ExchangeError::Http`]
pub fn interpret_submit_response(status: u16, body: &str) -> Result<SubmitOutcome, ExchangeError> {
    if (200..300).contains(&status) {
        return Ok(match order_id_of(body) {
            Some(venue_order_id) => SubmitOutcome::Accepted { venue_order_id },
            None => SubmitOutcome::Rejected {
                reason: body.to_string(),
            },
        });
    }

    let message = error_message(body);
    if (400..500).contains(&status) && message.to_lowercase().contains(INSUFFICIENT_FUNDS_MARKER) {
        return Err(ExchangeError::InsufficientFunds { message });
    }
    Err(ExchangeError::Http {
        status,
        body: body.to_string(),
    })
}

/// Map a `GET /orders/client:<token>` response.
pub fn interpret_lookup_response(status: u16, body: &str) -> Result<OrderLookup, ExchangeError> {
    match status {
        404 => Ok(OrderLookup::NotFound),
        200..=299 => order_id_of(body)
            .map(|venue_order_id| OrderLookup::Found { venue_order_id })
            .ok_or_else(|| ExchangeError::Decode(format!("lookup response without id: {body}"))),
        _ => Err(ExchangeError::Http {
            status,
            body: body.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_with_id_is_accepted() {
        let out = interpret_submit_response(200, r#"{"id":"abc-123","status":"pending"}"#).unwrap();
        assert_eq!(
            out,
            SubmitOutcome::Accepted {
                venue_order_id: "abc-123".to_string()
            }
        );
    }

    #[test]
    fn success_without_id_is_rejected_with_raw_body() {
        let body = r#"{"status":"rejected","reject_reason":"post only"}"#;
        let out = interpret_submit_response(200, body).unwrap();
        assert_eq!(
            out,
            SubmitOutcome::Rejected {
                reason: body.to_string()
            }
        );
    }

    #[test]
    fn non_json_success_is_rejected_with_raw_body() {
        let out = interpret_submit_response(200, "ok").unwrap();
        assert_eq!(
            out,
            SubmitOutcome::Rejected {
                reason: "ok".to_string()
            }
        );
    }

    #[test]
    fn bad_request_insufficient_funds_is_recognized() {
        let err = interpret_submit_response(400, r#"{"message":"Insufficient funds"}"#).unwrap_err();
        assert!(err.is_insufficient_funds());
    }

    #[test]
    fn other_bad_request_is_http_error() {
        let err = interpret_submit_response(400, r#"{"message":"size is too small"}"#).unwrap_err();
        assert!(matches!(err, ExchangeError::Http { status: 400, .. }));
    }

    #[test]
    fn server_error_mentioning_funds_is_not_recognized() {
        let err = interpret_submit_response(500, "Insufficient funds").unwrap_err();
        assert!(matches!(err, ExchangeError::Http { status: 500, .. }));
    }

    #[test]
    fn lookup_found_and_not_found() {
        assert_eq!(
            interpret_lookup_response(200, r#"{"id":"v-9"}"#).unwrap(),
            OrderLookup::Found {
                venue_order_id: "v-9".to_string()
            }
        );
        assert_eq!(
            interpret_lookup_response(404, r#"{"message":"NotFound"}"#).unwrap(),
            OrderLookup::NotFound
        );
    }

    #[test]
    fn lookup_server_error_is_an_error() {
        assert!(matches!(
            interpret_lookup_response(503, ""),
            Err(ExchangeError::Http { status: 503, .. })
        ));
        assert!(matches!(
            interpret_lookup_response(200, "{}"),
            Err(ExchangeError::Decode(_))
        ));
    }
}
