use crate::shipment::StatusCode;

// Keyword families in precedence order; the first family with a hit wins.
const FAMILIES: &[(StatusCode, &[&str])] = &[
    (StatusCode::Delivered, &["送達", "配交", "簽收", "delivered", "signed"]),
    (StatusCode::Delivery, &["配達", "配送", "派送", "out for delivery"]),
    (StatusCode::Transit, &["轉運", "發送", "到著", "抵達", "in transit"]),
    (StatusCode::Pickup, &["集貨", "取件", "picked up"]),
    (StatusCode::Exception, &["異常", "客戶不在", "地址錯誤", "exception"]),
];

fn contains_any(lowered: &str, words: &[&str]) -> bool {
    words.iter().any(|w| lowered.contains(w))
}

pub fn classify(status_text: &str) -> StatusCode {
    let lowered = status_text.to_lowercase();
    FAMILIES
        .iter()
        .find(|(_, words)| contains_any(&lowered, words))
        .map(|(code, _)| *code)
        .unwrap_or(StatusCode::Custom)
}

/// True when the text carries delivery-confirming wording.
pub fn mentions_delivered(status_text: &str) -> bool {
    classify(status_text) == StatusCode::Delivered
}
