use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Returned when no broadcast is currently live.
pub const NO_ACTIVE_BROADCAST: i64 = -1;

#[derive(Deserialize)]
struct BroadcastList {
    #[serde(default)]
    items: Vec<Broadcast>,
}

#[derive(Deserialize)]
struct Broadcast {
    #[serde(default)]
    statistics: Option<BroadcastStatistics>,
}

#[derive(Deserialize)]
struct BroadcastStatistics {
    #[serde(
        rename = "concurrentViewers",
        default,
        deserialize_with = "count_from_number_or_string"
    )]
    concurrent_viewers: Option<i64>,
}

/// The API encodes 64-bit counters as decimal strings.
fn count_from_number_or_string<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(i64),
        Text(String),
    }

    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Count::Number(n)) => Ok(Some(n)),
        Some(Count::Text(s)) => {
            s.trim().parse().map(Some).map_err(de::Error::custom)
        }
    }
}

/// Fetches the concurrent viewer count of the first active broadcast,
/// or [`NO_ACTIVE_BROADCAST`] when nothing is live.
pub async fn fetch_active_viewer_count(
    http: &reqwest::Client,
    broadcasts_uri: &str,
    access_token: &str,
) -> Result<i64> {
    let response = http
        .get(broadcasts_uri)
        .query(&[("part", "statistics"), ("broadcastStatus", "active")])
        .bearer_auth(access_token)
        .send()
        .await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(%status, %body, "Broadcast lookup rejected");
        return Err(Error::BroadcastFetchFailed { status });
    }

    let list: BroadcastList = response.json().await?;
    let Some(first) = list.items.into_iter().next() else {
        tracing::info!("No active broadcast");
        return Ok(NO_ACTIVE_BROADCAST);
    };

    first
        .statistics
        .and_then(|stats| stats.concurrent_viewers)
        .ok_or(Error::MissingViewerCount)
}
