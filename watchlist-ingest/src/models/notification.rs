//! Notification payloads and subscriber recipient selection

use serde::{Deserialize, Serialize};

/// One analytics row as carried in a notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceBreakdown {
    pub list_name: String,
    pub list_desc: String,
    pub old_record: i64,
    pub new_record: i64,
    pub total: i64,
}

/// What gets handed to the notification collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub cycle_id: String,
    pub message_code: String,
    pub breakdown: Vec<SourceBreakdown>,
    pub breakdown_total: i64,
    pub old_total: i64,
    pub grand_total: i64,
    /// Pretty-printed JSON of the breakdown
    pub analysis_summary: String,
    pub attachment_path: Option<String>,
}

/// Subscriber row from the directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub message_code: String,
    /// JSON list of `{"ricaEmailReciever": "..."}` objects (or bare strings)
    pub email_receivers: Option<String>,
    pub respondent_flag: Option<String>,
    pub respondent_email: Option<String>,
    pub investigator_flag: Option<String>,
    pub investigator_email: Option<String>,
    pub owner_flag: Option<String>,
    pub owner_email: Option<String>,
    pub next_owner_flag: Option<String>,
    pub next_owner_email: Option<String>,
}

impl Subscriber {
    /// Configured receivers plus each role address whose flag is `yes`
    ///
    /// Spaces are removed from addresses; the list is de-duplicated while
    /// keeping first-seen order.
    pub fn recipients(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |address: &str| {
            let cleaned: String = address.chars().filter(|c| *c != ' ').collect();
            if !cleaned.is_empty() && !out.contains(&cleaned) {
                out.push(cleaned);
            }
        };

        if let Some(raw) = self.email_receivers.as_deref() {
            match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(serde_json::Value::Array(items)) => {
                    for item in items {
                        match item {
                            serde_json::Value::String(s) => push(&s),
                            serde_json::Value::Object(map) => {
                                if let Some(s) = map.get("ricaEmailReciever").and_then(|v| v.as_str()) {
                                    push(s);
                                }
                            }
                            _ => {}
                        }
                    }
                }
                Ok(_) | Err(_) => {
                    tracing::warn!(
                        message_code = %self.message_code,
                        "Subscriber email receiver list is not a JSON array, ignoring"
                    );
                }
            }
        }

        let roles = [
            (&self.respondent_flag, &self.respondent_email),
            (&self.investigator_flag, &self.investigator_email),
            (&self.owner_flag, &self.owner_email),
            (&self.next_owner_flag, &self.next_owner_email),
        ];
        for (flag, email) in roles {
            let enabled = flag
                .as_deref()
                .map(|f| f.trim().eq_ignore_ascii_case("yes"))
                .unwrap_or(false);
            if let (true, Some(address)) = (enabled, email.as_deref()) {
                push(address);
            }
        }

        out
    }
}
