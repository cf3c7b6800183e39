use serde::{Deserialize, Serialize};

/// Body of `POST /games/{id}/move`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoveRequest {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_left: Option<u64>,
}

impl MoveRequest {
    pub fn new(from: &str, to: &str) -> Self {
        MoveRequest {
            from: from.to_string(),
            to: to.to_string(),
            promotion: None,
            time_taken: None,
            time_left: None,
        }
    }

    pub fn with_promotion(from: &str, to: &str, promotion: &str) -> Self {
        MoveRequest {
            promotion: Some(promotion.to_string()),
            ..MoveRequest::new(from, to)
        }
    }

    /// Parses long algebraic notation such as `e2e4` or `e7e8q`.
    pub fn from_uci(uci: &str) -> Option<Self> {
        if !uci.is_ascii() || !(4..=5).contains(&uci.len()) {
            return None;
        }
        let (from, rest) = uci.split_at(2);
        let (to, promotion) = rest.split_at(2);
        Some(MoveRequest {
            promotion: (!promotion.is_empty()).then(|| promotion.to_string()),
            ..MoveRequest::new(from, to)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unknown_fields() {
        let result = serde_json::from_str::<MoveRequest>(r#"{"from":"e2","to":"e4","extra":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_negative_clock_values() {
        let result =
            serde_json::from_str::<MoveRequest>(r#"{"from":"e2","to":"e4","time_left":-5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_accepts_null_promotion() {
        let request: MoveRequest =
            serde_json::from_str(r#"{"from":"e2","to":"e4","promotion":null}"#).unwrap();
        assert_eq!(request, MoveRequest::new("e2", "e4"));
    }

    #[test]
    fn test_from_uci() {
        assert_eq!(MoveRequest::from_uci("e2e4"), Some(MoveRequest::new("e2", "e4")));
        assert_eq!(
            MoveRequest::from_uci("a7a8q"),
            Some(MoveRequest::with_promotion("a7", "a8", "q"))
        );
        assert_eq!(MoveRequest::from_uci("e2"), None);
    }
}
