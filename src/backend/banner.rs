use serde_json::Value;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const DEFAULT_GREETINGS: &[&str] = &["bienvenido", "welcome"];

const WELCOME_EVENT: &str = "welcome";

// -----------------------------------------------------------------------------
// ----- BannerFilter ----------------------------------------------------------

/// Recognizes the unsolicited greeting some backends push right after accept.
///
/// A line is a banner when it is a JSON object whose `message` string contains
/// one of the greetings (case-insensitive), or whose `event` is `"welcome"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerFilter {
    greetings: Vec<String>,
}

impl BannerFilter {
    pub fn new<I, S>(greetings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let greetings = greetings
            .into_iter()
            .map(|g| g.as_ref().trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .collect();

        Self { greetings }
    }

    pub fn greetings(&self) -> &[String] {
        &self.greetings
    }

    pub fn is_banner(&self, line: &str) -> bool {
        let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(line) else {
            return false;
        };

        if let Some(Value::String(message)) = fields.get("message") {
            let message = message.to_lowercase();
            if self.greetings.iter().any(|g| message.contains(g.as_str())) {
                return true;
            }
        }

        matches!(fields.get("event"), Some(Value::String(e)) if e == WELCOME_EVENT)
    }
}

impl Default for BannerFilter {
    fn default() -> Self {
        Self::new(DEFAULT_GREETINGS)
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_message_is_a_banner() {
        let filter = BannerFilter::default();
        assert!(filter.is_banner(r#"{"message":"Bienvenido"}"#));
        assert!(filter.is_banner(r#"{"message":"¡BIENVENIDO al servidor!"}"#));
        assert!(filter.is_banner(r#"{"message":"Welcome, client"}"#));
    }

    #[test]
    fn welcome_event_is_a_banner() {
        let filter = BannerFilter::new(Vec::<String>::new());
        assert!(filter.is_banner(r#"{"event":"welcome","v":2}"#));
        assert!(!filter.is_banner(r#"{"event":"tick"}"#));
    }

    #[test]
    fn ordinary_responses_are_not_banners() {
        let filter = BannerFilter::default();
        assert!(!filter.is_banner(r#"{"ok":true,"tipos":["a","b"]}"#));
        assert!(!filter.is_banner(r#"{"message":42}"#));
        assert!(!filter.is_banner(r#"["bienvenido"]"#));
        assert!(!filter.is_banner("not-json"));
    }

    #[test]
    fn custom_greetings_are_normalized() {
        let filter = BannerFilter::new(["  HOLA ", ""]);
        assert_eq!(filter.greetings(), ["hola"]);
        assert!(filter.is_banner(r#"{"message":"hola mundo"}"#));
        assert!(!filter.is_banner(r#"{"message":"Bienvenido"}"#));
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
