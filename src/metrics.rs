//! Metric name constants.

use std::time::Duration;

use anyhow::Context;
use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config;

pub const AUTH_FAILED: &str = "barangay.auth.failed"; // Counter.
pub const SESSIONS_CREATED: &str = "barangay.auth.sessions"; // Counter.

pub const COMPLAINTS_FILED: &str = "barangay.complaints.filed"; // Counter.
pub const COMPLAINT_STATUS_UPDATES: &str = "barangay.complaints.status_updates"; // Counter.
pub const COMPLAINT_NOTES: &str = "barangay.complaints.notes"; // Counter.

pub const FORUM_POSTS: &str = "barangay.forum.posts"; // Counter.
pub const FORUM_REPLIES: &str = "barangay.forum.replies"; // Counter.

/// Must be ran exactly once on startup. This will declare all of the instruments for `metrics`.
pub fn setup(config: Option<&config::MetricConfig>) -> anyhow::Result<()> {
    describe_counter!(AUTH_FAILED, "The number of failed authentication attempts.");
    describe_counter!(
        SESSIONS_CREATED,
        "The number of resident and admin sessions issued."
    );

    describe_counter!(COMPLAINTS_FILED, "The count of complaints filed.");
    describe_counter!(
        COMPLAINT_STATUS_UPDATES,
        "The count of complaint status changes."
    );
    describe_counter!(COMPLAINT_NOTES, "The count of admin notes appended.");

    describe_counter!(FORUM_POSTS, "The count of forum posts created.");
    describe_counter!(FORUM_REPLIES, "The count of forum replies created.");

    if let Some(config) = config {
        match config {
            config::MetricConfig::PrometheusPush(prometheus_config) => {
                PrometheusBuilder::new()
                    .with_push_gateway(
                        prometheus_config.url.clone(),
                        Duration::from_secs(10),
                        None,
                        None,
                    )
                    .context("failed to set up push gateway")?
                    .install()
                    .context("failed to install metrics exporter")?;
            }
        }
    }

    Ok(())
}
