//! Quiniela proxy — fixture resolver
//!
//! Two sequential calls against loteriasyapuestas.es:
//!   1. proximosv3  → next draw, `fecha` = "2024-05-18T00:00:00"
//!   2. fechav3     → fixtures of that draw, keyed by "20240518"
//!
//! Both endpoints answer with a one-element array; element [0] is the
//! upstream's contract, we just take it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use upstream::{FetchError, JsonFetcher};

pub const NEXT_DRAW_URL: &str = "https://www.loteriasyapuestas.es/servicios/proximosv3?game_id=LAQU";
pub const FIXTURES_URL_BASE: &str = "https://www.loteriasyapuestas.es/servicios/fechav3?game_id=LAQU&fecha_sorteo=";

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("could not get the date of the next draw")]
    MissingDate,

    #[error("could not get the list of matches for the draw")]
    MissingFixtures,

    #[error("draw date '{0}' does not give a YYYYMMDD key")]
    InvalidDateKey(String),

    #[error(transparent)]
    Upstream(#[from] FetchError),
}

/// First record of proximosv3. Only `fecha` matters, the rest rides along.
#[derive(Debug, Clone, Deserialize)]
pub struct DrawDateRecord {
    pub fecha: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// First record of fechav3, returned to clients as-is. The whole object is
/// kept, key order included; only `partidos` is checked.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FixtureRecord(Map<String, Value>);

impl FixtureRecord {
    /// `None` unless `record` is an object whose `partidos` is a list.
    pub fn from_value(record: Value) -> Option<Self> {
        match record {
            Value::Object(map) if map.get("partidos").is_some_and(Value::is_array) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn partidos(&self) -> &[Value] {
        self.0
            .get("partidos")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

pub fn fixtures_url(date_key: &str) -> String {
    format!("{FIXTURES_URL_BASE}{date_key}")
}

pub fn is_date_key(s: &str) -> bool {
    s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit())
}

/// "2024-05-18T00:00:00" → "20240518"
pub fn date_key(fecha: &str) -> Result<String, ResolutionError> {
    let key: String = fecha.chars().take(10).filter(|&c| c != '-').collect();
    if is_date_key(&key) {
        Ok(key)
    } else {
        Err(ResolutionError::InvalidDateKey(fecha.to_string()))
    }
}

fn first_record(payload: Value) -> Option<Value> {
    match payload {
        Value::Array(items) => items.into_iter().next(),
        _ => None,
    }
}

fn parse_draw_date(payload: Value) -> Result<DrawDateRecord, ResolutionError> {
    first_record(payload)
        .and_then(|record| serde_json::from_value::<DrawDateRecord>(record).ok())
        .filter(|record| !record.fecha.is_empty())
        .ok_or(ResolutionError::MissingDate)
}

fn parse_fixtures(payload: Value) -> Result<FixtureRecord, ResolutionError> {
    first_record(payload)
        .and_then(FixtureRecord::from_value)
        .ok_or(ResolutionError::MissingFixtures)
}

pub struct FixtureResolver {
    fetcher: Arc<dyn JsonFetcher>,
}

impl FixtureResolver {
    pub fn new(fetcher: Arc<dyn JsonFetcher>) -> Self {
        Self { fetcher }
    }

    pub fn fetcher_name(&self) -> &'static str {
        self.fetcher.name()
    }

    /// Raw proximosv3 payload.
    pub async fn next_draw(&self) -> Result<Value, ResolutionError> {
        Ok(self.fetcher.fetch_json(NEXT_DRAW_URL).await?)
    }

    /// Raw fechav3 payload for an already compact key.
    pub async fn fixtures_for(&self, date_key: &str) -> Result<Value, ResolutionError> {
        if !is_date_key(date_key) {
            return Err(ResolutionError::InvalidDateKey(date_key.to_string()));
        }
        Ok(self.fetcher.fetch_json(&fixtures_url(date_key)).await?)
    }

    /// Next draw → its fixtures. Strictly sequential.
    pub async fn resolve(&self) -> Result<FixtureRecord, ResolutionError> {
        let draw = parse_draw_date(self.next_draw().await?)?;
        let key = date_key(&draw.fecha)?;
        info!("next Quiniela draw {} (key {})", draw.fecha, key);

        let fixtures = parse_fixtures(self.fixtures_for(&key).await?)?;
        info!("draw {}: {} matches", key, fixtures.partidos().len());
        Ok(fixtures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory upstream: exact URL → payload, anything else 404.
    #[derive(Default)]
    struct FakeUpstream {
        routes: HashMap<String, Value>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeUpstream {
        fn with(mut self, url: &str, payload: Value) -> Self {
            self.routes.insert(url.to_string(), payload);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JsonFetcher for FakeUpstream {
        async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.routes.get(url).cloned().ok_or(FetchError::Blocked { status: 404 })
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn resolver(upstream: FakeUpstream) -> (FixtureResolver, Arc<FakeUpstream>) {
        let upstream = Arc::new(upstream);
        (FixtureResolver::new(upstream.clone()), upstream)
    }

    #[test]
    fn date_key_strips_time_and_dashes() {
        assert_eq!(date_key("2024-05-18T00:00:00").unwrap(), "20240518");
        assert_eq!(date_key("2024-05-18").unwrap(), "20240518");
    }

    #[test]
    fn date_key_rejects_short_or_odd_dates() {
        assert!(matches!(date_key("2024-5-18"), Err(ResolutionError::InvalidDateKey(_))));
        assert!(matches!(date_key("18/05/2024"), Err(ResolutionError::InvalidDateKey(_))));
        assert!(matches!(date_key(""), Err(ResolutionError::InvalidDateKey(_))));
    }

    #[test]
    fn fixtures_url_interpolates_key() {
        assert_eq!(
            fixtures_url("20240518"),
            "https://www.loteriasyapuestas.es/servicios/fechav3?game_id=LAQU&fecha_sorteo=20240518"
        );
    }

    #[tokio::test]
    async fn resolves_fixtures_of_next_draw() {
        let (resolver, upstream) = resolver(
            FakeUpstream::default()
                .with(NEXT_DRAW_URL, json!([{"fecha": "2024-05-18T00:00:00", "id_sorteo": "1234"}]))
                .with(
                    &fixtures_url("20240518"),
                    json!([{"partidos": [{"home": "A", "away": "B"}], "jornada": 38}]),
                ),
        );

        let record = resolver.resolve().await.unwrap();

        assert_eq!(record.partidos(), &[json!({"home": "A", "away": "B"})]);
        assert_eq!(record.get("jornada"), Some(&json!(38)));
        assert_eq!(upstream.calls(), vec![NEXT_DRAW_URL.to_string(), fixtures_url("20240518")]);
    }

    #[tokio::test]
    async fn fixtures_keep_upstream_key_order() {
        let (resolver, _) = resolver(
            FakeUpstream::default()
                .with(NEXT_DRAW_URL, json!([{"fecha": "2024-05-18T00:00:00"}]))
                .with(
                    &fixtures_url("20240518"),
                    json!([{"jornada": 38, "fecha": "x", "partidos": [{"home": "A", "away": "B"}]}]),
                ),
        );

        let record = resolver.resolve().await.unwrap();

        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"jornada":38,"fecha":"x","partidos":[{"home":"A","away":"B"}]}"#
        );
    }

    #[tokio::test]
    async fn partidos_that_is_not_a_list_is_missing_fixtures() {
        let (resolver, _) = resolver(
            FakeUpstream::default()
                .with(NEXT_DRAW_URL, json!([{"fecha": "2024-05-18T00:00:00"}]))
                .with(&fixtures_url("20240518"), json!([{"partidos": "none"}])),
        );

        assert!(matches!(resolver.resolve().await, Err(ResolutionError::MissingFixtures)));
    }

    #[tokio::test]
    async fn empty_next_draw_fails_without_second_call() {
        let (resolver, upstream) = resolver(FakeUpstream::default().with(NEXT_DRAW_URL, json!([])));

        let err = resolver.resolve().await.unwrap_err();

        assert!(matches!(err, ResolutionError::MissingDate), "{err:?}");
        assert_eq!(upstream.calls(), vec![NEXT_DRAW_URL.to_string()]);
    }

    #[tokio::test]
    async fn next_draw_without_fecha_is_missing_date() {
        for payload in [json!([{"id_sorteo": "1"}]), json!([{"fecha": ""}]), json!({"fecha": "2024-05-18"})] {
            let (resolver, _) = resolver(FakeUpstream::default().with(NEXT_DRAW_URL, payload));
            assert!(matches!(resolver.resolve().await, Err(ResolutionError::MissingDate)));
        }
    }

    #[tokio::test]
    async fn fixtures_without_partidos_is_missing_fixtures() {
        let (resolver, _) = resolver(
            FakeUpstream::default()
                .with(NEXT_DRAW_URL, json!([{"fecha": "2024-05-18T00:00:00"}]))
                .with(&fixtures_url("20240518"), json!([{"jornada": 38}])),
        );

        let err = resolver.resolve().await.unwrap_err();
        assert!(matches!(err, ResolutionError::MissingFixtures), "{err:?}");
    }

    #[tokio::test]
    async fn empty_fixtures_list_is_missing_fixtures() {
        let (resolver, _) = resolver(
            FakeUpstream::default()
                .with(NEXT_DRAW_URL, json!([{"fecha": "2024-05-18T00:00:00"}]))
                .with(&fixtures_url("20240518"), json!([])),
        );

        assert!(matches!(resolver.resolve().await, Err(ResolutionError::MissingFixtures)));
    }

    #[tokio::test]
    async fn upstream_failure_propagates() {
        let (resolver, _) = resolver(FakeUpstream::default());

        let err = resolver.resolve().await.unwrap_err();
        assert!(matches!(err, ResolutionError::Upstream(FetchError::Blocked { status: 404 })));
    }

    #[tokio::test]
    async fn fixtures_for_rejects_bad_key_before_fetching() {
        let (resolver, upstream) = resolver(FakeUpstream::default());

        let err = resolver.fixtures_for("2024&x=1").await.unwrap_err();

        assert!(matches!(err, ResolutionError::InvalidDateKey(_)));
        assert!(upstream.calls().is_empty());
    }
}
