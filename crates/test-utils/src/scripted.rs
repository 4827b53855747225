//! A [`WeatherSource`] that answers from a script instead of the network.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use brightsky::{FetchTarget, SourceDescriptor, WeatherSource};
use chrono::{DateTime, Utc};
use weather_common::{WeatherError, WeatherRecord, WeatherResult};

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Reply {
    Records(Vec<WeatherRecord>),
    Timeout,
    Status(u16),
    /// A body that could not be decoded.
    Malformed,
}

impl Reply {
    fn produce(&self, target: &str) -> WeatherResult<Vec<WeatherRecord>> {
        match self {
            Reply::Records(records) => Ok(records.clone()),
            Reply::Timeout => Err(WeatherError::Timeout),
            Reply::Status(status) => Err(WeatherError::Api {
                status: *status,
                url: format!("scripted://{}", target),
                message: "scripted failure".into(),
            }),
            Reply::Malformed => Err(WeatherError::Decode("scripted garbage".into())),
        }
    }
}

/// A recorded `fetch_weather` call.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchCall {
    pub target: FetchTarget,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Scripted weather source.
///
/// Replies are queued per target. Each call takes the next queued reply;
/// the last one repeats. Unscripted targets answer with no records.
#[derive(Default)]
pub struct ScriptedSource {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    stations: Mutex<Option<Reply>>,
    sources: Mutex<Vec<SourceDescriptor>>,
    calls: Mutex<Vec<FetchCall>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for a station queried by WMO id.
    pub fn on_station(&self, wmo: &str, reply: Reply) -> &Self {
        self.push(FetchTarget::Station(wmo.to_string()), reply)
    }

    /// Queue a reply for a coordinate query.
    pub fn on_coordinates(&self, lat: f64, lon: f64, reply: Reply) -> &Self {
        self.push(FetchTarget::Coordinates { lat, lon }, reply)
    }

    /// Replace the whole script for a WMO id with a single reply.
    pub fn set_station(&self, wmo: &str, reply: Reply) -> &Self {
        let key = FetchTarget::Station(wmo.to_string()).to_string();
        self.replies
            .lock()
            .unwrap()
            .insert(key, VecDeque::from([reply]));
        self
    }

    /// Sources returned by station search.
    pub fn with_sources(&self, sources: Vec<SourceDescriptor>) -> &Self {
        *self.sources.lock().unwrap() = sources;
        *self.stations.lock().unwrap() = None;
        self
    }

    /// Make station search fail (any non-`Records` reply).
    pub fn fail_station_search(&self, reply: Reply) -> &Self {
        *self.stations.lock().unwrap() = Some(reply);
        self
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, target: &FetchTarget) -> Vec<FetchCall> {
        self.calls()
            .into_iter()
            .filter(|c| &c.target == target)
            .collect()
    }

    fn push(&self, target: FetchTarget, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry(target.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    fn next_reply(&self, key: &str) -> Option<Reply> {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl WeatherSource for ScriptedSource {
    async fn find_stations(
        &self,
        _lat: f64,
        _lon: f64,
        _max_distance_m: u32,
    ) -> WeatherResult<Vec<SourceDescriptor>> {
        if let Some(reply) = self.stations.lock().unwrap().as_ref() {
            reply.produce("sources")?;
        }
        Ok(self.sources.lock().unwrap().clone())
    }

    async fn fetch_weather(
        &self,
        target: &FetchTarget,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> WeatherResult<Vec<WeatherRecord>> {
        self.calls.lock().unwrap().push(FetchCall {
            target: target.clone(),
            from,
            to,
        });

        let key = target.to_string();
        match self.next_reply(&key) {
            Some(reply) => reply.produce(&key),
            None => Ok(Vec::new()),
        }
    }
}
