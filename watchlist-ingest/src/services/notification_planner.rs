//! Notification Planner
//!
//! Decides whether a cycle notifies, builds the payload from the cycle's
//! analytics and selects recipients per subscriber. Delivery is left to the
//! `Notifier` collaborator.

use crate::models::{NotificationPayload, Subscriber};
use crate::services::analytics_builder::CycleAnalytics;
use crate::types::{Notifier, SubscriberDirectory};
use std::sync::Arc;
use watchlist_common::Result;

/// One payload addressed to one subscriber's recipients
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedNotification {
    pub payload: NotificationPayload,
    pub recipients: Vec<String>,
}

/// Payloads for every subscriber with at least one recipient
///
/// Empty when the cycle staged no new records.
pub fn plan_notifications(
    cycle_id: &str,
    analytics: &CycleAnalytics,
    subscribers: &[Subscriber],
    attachment_path: Option<&str>,
) -> Vec<PlannedNotification> {
    if analytics.breakdown_total() == 0 {
        return Vec::new();
    }

    let breakdown = analytics.breakdown();
    let analysis_summary =
        serde_json::to_string_pretty(&analytics.to_json()).unwrap_or_else(|_| "{}".to_string());

    subscribers
        .iter()
        .filter_map(|subscriber| {
            let recipients = subscriber.recipients();
            if recipients.is_empty() {
                tracing::debug!(message_code = %subscriber.message_code, "Subscriber has no recipients");
                return None;
            }
            Some(PlannedNotification {
                payload: NotificationPayload {
                    cycle_id: cycle_id.to_string(),
                    message_code: subscriber.message_code.clone(),
                    breakdown: breakdown.clone(),
                    breakdown_total: analytics.breakdown_total(),
                    old_total: analytics.old_total(),
                    grand_total: analytics.grand_total(),
                    analysis_summary: analysis_summary.clone(),
                    attachment_path: attachment_path.map(str::to_string),
                },
                recipients,
            })
        })
        .collect()
}

pub struct NotificationPlanner {
    subscribers: Arc<dyn SubscriberDirectory>,
    notifier: Arc<dyn Notifier>,
}

impl NotificationPlanner {
    pub fn new(subscribers: Arc<dyn SubscriberDirectory>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            subscribers,
            notifier,
        }
    }

    /// Plan and hand off notifications; `true` when at least one was delivered
    ///
    /// A failing delivery is logged and the remaining subscribers are still
    /// notified.
    pub async fn notify(&self, cycle_id: &str, analytics: &CycleAnalytics) -> Result<bool> {
        if analytics.breakdown_total() == 0 {
            tracing::info!(cycle_id, "No new records, skipping notification");
            return Ok(false);
        }

        let subscribers = self.subscribers.subscribers().await?;
        let planned = plan_notifications(cycle_id, analytics, &subscribers, None);

        let mut delivered = false;
        for notification in &planned {
            match self
                .notifier
                .notify(&notification.payload, &notification.recipients)
                .await
            {
                Ok(()) => delivered = true,
                Err(e) => tracing::warn!(
                    cycle_id,
                    message_code = %notification.payload.message_code,
                    error = %e,
                    "Notification delivery failed"
                ),
            }
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analytics_builder::build_analytics;
    use std::collections::HashMap;

    fn analytics(new: i64) -> CycleAnalytics {
        let snapshot: HashMap<String, i64> = [("UN".to_string(), 5)].into_iter().collect();
        let staged: HashMap<String, i64> = [("UN".to_string(), new)].into_iter().collect();
        build_analytics(&snapshot, &staged, &["RUN_UN_LIST".to_string()], &HashMap::new())
    }

    fn subscriber(code: &str, owner: Option<&str>) -> Subscriber {
        Subscriber {
            message_code: code.to_string(),
            owner_flag: owner.map(|_| "yes".to_string()),
            owner_email: owner.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_plan_without_new_records() {
        let planned = plan_notifications("c1", &analytics(0), &[subscriber("WL", Some("a@x.com"))], None);
        assert!(planned.is_empty());
    }

    #[test]
    fn test_payload_per_subscriber_with_recipients() {
        let subs = vec![
            subscriber("WL_UPDATE", Some("a@x.com")),
            subscriber("WL_SILENT", None),
            subscriber("WL_AUDIT", Some("b@x.com")),
        ];
        let planned = plan_notifications("c1", &analytics(3), &subs, Some("/tmp/new.xlsx"));

        assert_eq!(planned.len(), 2);
        let first = &planned[0];
        assert_eq!(first.payload.message_code, "WL_UPDATE");
        assert_eq!(first.recipients, vec!["a@x.com".to_string()]);
        assert_eq!(first.payload.breakdown_total, 3);
        assert_eq!(first.payload.old_total, 5);
        assert_eq!(first.payload.grand_total, 8);
        assert_eq!(first.payload.attachment_path.as_deref(), Some("/tmp/new.xlsx"));
        assert!(first.payload.analysis_summary.contains("\"new_record\": 3"));
        assert_eq!(planned[1].payload.message_code, "WL_AUDIT");
    }
}
