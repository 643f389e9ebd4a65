use chrono::{DateTime, Utc};

use super::types::*;
use crate::carrier::CarrierClient;
use crate::extractor::{diagnose, extract};
use crate::shipment::is_valid_tracking_number;

/// The query endpoint as a pure function of method, query parameter and carrier.
///
/// Validation happens before any fetch, so a malformed number never reaches the carrier.
pub async fn handle<C>(carrier: &C, method: Method, tracking_number: Option<&str>, now: DateTime<Utc>) -> HttpReply
where
    C: CarrierClient + ?Sized,
{
    match method {
        Method::Options => return HttpReply::new(200, None),
        Method::Other => return HttpReply::new(405, Some(QueryResponse::failure(None, METHOD_NOT_ALLOWED))),
        Method::Get => {}
    }

    let tn = match tracking_number {
        None | Some("") => return HttpReply::new(400, Some(QueryResponse::failure(None, MISSING_NUMBER))),
        Some(tn) if !is_valid_tracking_number(tn) => {
            return HttpReply::new(400, Some(QueryResponse::failure(Some(tn), MALFORMED_NUMBER)));
        }
        Some(tn) => tn,
    };

    let html = match carrier.fetch_page(tn).await {
        Ok(html) => html,
        Err(err) => {
            tracing::warn!(tracking_number = %tn, error = %err, "carrier fetch failed");
            return HttpReply::new(500, Some(QueryResponse::failure(Some(tn), err.to_string())));
        }
    };

    let events = extract(&html);
    if events.is_empty() {
        return HttpReply::new(200, Some(QueryResponse::not_found(tn, diagnose(&html))));
    }
    HttpReply::new(200, Some(QueryResponse::found(tn, events, now)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::mock::MockCarrier;
    use crate::carrier::CarrierError;
    use crate::extractor::RawEvent;

    const PAGE: &str = r#"<div class="grid-item col_optime">2025/10/22 12:37</div><div class="grid-item">順利送達</div>"#;

    fn body(reply: &HttpReply) -> &QueryResponse { reply.body.as_ref().unwrap() }

    #[tokio::test]
    async fn malformed_number_rejected_before_fetch() {
        let mock = MockCarrier::new();
        let reply = handle(&mock, Method::Get, Some("123"), Utc::now()).await;
        assert_eq!(reply.status, 400);
        assert_eq!(body(&reply).error.as_deref(), Some(MALFORMED_NUMBER));
        assert!(!body(&reply).success);
        assert!(mock.calls().is_empty());

        let reply = handle(&mock, Method::Get, None, Utc::now()).await;
        assert_eq!(reply.status, 400);
        assert_eq!(body(&reply).error.as_deref(), Some(MISSING_NUMBER));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn padded_number_is_malformed() {
        let mock = MockCarrier::new();
        let reply = handle(&mock, Method::Get, Some(" 6714484884 "), Utc::now()).await;
        assert_eq!(reply.status, 400);
        assert_eq!(body(&reply).error.as_deref(), Some(MALFORMED_NUMBER));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn method_handling() {
        let mock = MockCarrier::new();
        let opts = handle(&mock, Method::Options, None, Utc::now()).await;
        assert_eq!((opts.status, opts.body.is_none()), (200, true));
        assert_eq!(opts.headers, CORS_HEADERS.to_vec());

        let post = handle(&mock, Method::parse("post"), Some("6714484884"), Utc::now()).await;
        assert_eq!(post.status, 405);
        assert_eq!(body(&post).error.as_deref(), Some(METHOD_NOT_ALLOWED));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn found_events_are_listed() {
        let mock = MockCarrier::new();
        mock.push_page(Ok(PAGE.to_string()));
        let now = Utc::now();
        let reply = handle(&mock, Method::Get, Some("6714484884"), now).await;
        assert_eq!(reply.status, 200);
        let b = body(&reply);
        assert!(b.success);
        assert_eq!(b.status_list.as_deref(), Some(&[RawEvent::new("2025/10/22 12:37", "順利送達")][..]));
        assert_eq!(b.timestamp, Some(now));
        assert_eq!(mock.calls(), vec!["6714484884".to_string()]);
    }

    #[tokio::test]
    async fn empty_page_is_soft_not_found_with_debug() {
        let mock = MockCarrier::new();
        mock.push_page(Ok(format!("<html>{}</html>", "x".repeat(300))));
        let reply = handle(&mock, Method::Get, Some("6714484884"), Utc::now()).await;
        assert_eq!(reply.status, 200);
        let b = body(&reply);
        assert!(!b.success);
        assert_eq!(b.error.as_deref(), Some(NOT_FOUND));
        let debug = b.debug.as_ref().unwrap();
        assert_eq!(debug.html_length, 313);
        assert!(!debug.has_date_time);
    }

    #[tokio::test]
    async fn upstream_failure_is_500() {
        let mock = MockCarrier::new();
        mock.push_page(Err(CarrierError::Timeout));
        let reply = handle(&mock, Method::Get, Some("6714484884"), Utc::now()).await;
        assert_eq!(reply.status, 500);
        assert_eq!(body(&reply).tracking_number.as_deref(), Some("6714484884"));
        assert_eq!(body(&reply).error.as_deref(), Some("request timed out"));
    }

    #[test]
    fn wire_shape_uses_camel_case() {
        let v = serde_json::to_value(QueryResponse::found("6714484884", vec![], Utc::now())).unwrap();
        assert!(v.get("trackingNumber").is_some());
        assert!(v.get("statusList").is_some());
        assert!(v.get("error").is_none());
    }
}
