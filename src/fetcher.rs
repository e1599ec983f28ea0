// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Polls the server for aircraft list snapshots.

use std::sync::Arc;
use std::time::Duration;

use aircraft_list::{AircraftList, FetchRequest, SnapshotError};
use log::{debug, info, warn};
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

const ENDPOINT: &str = "AircraftList.json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Build the next request for `list`, letting `fetchingList` listeners
/// decorate it.
pub fn prepare_request(list: &AircraftList) -> FetchRequest {
    let mut request = FetchRequest::new();
    request.set_param("ldv", list.data_version().to_string());
    request.set_param("stm", list.server_ticks().to_string());
    if let Some(selected) = list.selected_aircraft() {
        request.set_param("selAc", selected.id().to_string());
    }

    let icaos = list.all_aircraft_icaos_string();
    if !icaos.is_empty() {
        request.set_body_field("icaos", icaos);
    }

    list.raise_fetching_list(&mut request);
    request
}

/// `{server}/AircraftList.json`, tolerating a trailing slash on the server URL.
pub fn endpoint_url(server_url: &str) -> String {
    format!("{}/{}", server_url.trim_end_matches('/'), ENDPOINT)
}

/// Fetches snapshots over HTTP and applies them to an aircraft list.
#[derive(Debug)]
pub struct Fetcher {
    client: reqwest::Client,
    endpoint: String,
    list: Arc<AircraftList>,
}

impl Fetcher {
    pub fn new(server_url: &str, list: Arc<AircraftList>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("airjedi-list/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint_url(server_url),
            list,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch one snapshot and apply it.
    pub async fn fetch_once(&self) -> Result<(), FetchError> {
        let request = prepare_request(&self.list);
        debug!("POST {} params={:?}", self.endpoint, request.params);

        let mut builder = self
            .client
            .post(&self.endpoint)
            .query(&request.params)
            .form(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?.error_for_status()?;
        let text = response.text().await?;
        self.list.apply_json_str(&text)?;
        Ok(())
    }

    /// Fetch on every tick of `interval` until cancelled or `max_fetches`
    /// requests have been made. Failed fetches are logged and retried on the
    /// next tick. Returns the number of requests made.
    pub async fn run(&self, interval: Duration, max_fetches: Option<u64>, cancel: CancellationToken) -> u64 {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Polling {} every {:?}", self.endpoint, interval);
        let mut fetches = 0;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = self.fetch_once() => {
                    if let Err(e) = result {
                        warn!("Aircraft list fetch failed: {}", e);
                    }
                }
            }

            fetches += 1;
            if max_fetches.is_some_and(|max| fetches >= max) {
                break;
            }
        }

        info!("Stopped polling after {} request(s)", fetches);
        fetches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aircraft_list::{
        AircraftFilter, AircraftListFilter, AircraftListFilterSettings, AircraftListSettings,
        FilterCondition, FilterProperty, GlobalDispatcher, SelectionSource, StaticServerCapabilities,
    };

    fn list() -> Arc<AircraftList> {
        Arc::new(AircraftList::new(AircraftListSettings::new(
            Arc::new(StaticServerCapabilities::new(true)),
            Arc::new(GlobalDispatcher::new("global")),
        )))
    }

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            endpoint_url("http://localhost:8080/VirtualRadar"),
            "http://localhost:8080/VirtualRadar/AircraftList.json"
        );
        assert_eq!(endpoint_url("http://radar/"), "http://radar/AircraftList.json");
    }

    #[test]
    fn test_first_request() {
        let request = prepare_request(&list());
        assert_eq!(request.param("ldv"), Some("-1"));
        assert_eq!(request.param("stm"), Some("0"));
        assert_eq!(request.param("selAc"), None);
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_request_after_snapshot() {
        let list = list();
        list.apply_json_str(
            r#"{"lastDv":"42","stm":1000,"acList":[
                {"Id":1,"Icao":"4CA123"},{"Id":2},{"Id":3,"Icao":"A0B1C2"}]}"#,
        )
        .unwrap();
        list.set_selected_aircraft(list.find_aircraft_by_id(3), SelectionSource::Program);

        let request = prepare_request(&list);
        assert_eq!(request.param("ldv"), Some("42"));
        assert_eq!(request.param("stm"), Some("1000"));
        assert_eq!(request.param("selAc"), Some("3"));

        let mut icaos: Vec<&str> = request.body["icaos"].split('-').collect();
        icaos.sort_unstable();
        assert_eq!(icaos, ["4CA123", "A0B1C2"]);
    }

    #[test]
    fn test_request_carries_filter_parameters() {
        let list = list();
        let filter = Arc::new(AircraftListFilter::new(AircraftListFilterSettings::default()));
        filter
            .add_filter(AircraftFilter::text(FilterProperty::Operator, FilterCondition::Contains, "air").unwrap())
            .unwrap();
        filter.set_enabled(true);
        filter.attach(&list);

        let request = prepare_request(&list);
        assert_eq!(request.param("fOpC"), Some("air"));
        assert_eq!(request.param("ldv"), Some("-1"));
    }

    #[test]
    fn test_fetcher_endpoint() {
        let fetcher = Fetcher::new("http://radar:8080/VirtualRadar/", list()).unwrap();
        assert_eq!(fetcher.endpoint(), "http://radar:8080/VirtualRadar/AircraftList.json");
    }

    #[tokio::test]
    async fn test_run_stops_when_cancelled() {
        let fetcher = Fetcher::new("http://127.0.0.1:9", list()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let fetches = fetcher.run(Duration::from_secs(1), None, cancel).await;
        assert_eq!(fetches, 0);
    }
}
