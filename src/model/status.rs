use std::fmt::Formatter;

use serde_json::{Map, Value};

use super::command::{
    MODE_DOCK, MODE_EDGE_CUT, MODE_MOWING, RESP_RAIN_STATUS, RESP_ROBOT_STATUS,
};

/// What the mower is currently doing, derived from `mode` and `station`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Activity {
    Mowing,
    Paused,
    Docked,
}

impl AsRef<str> for Activity {
    fn as_ref(&self) -> &str {
        match self {
            Self::Mowing => "mowing",
            Self::Paused => "paused",
            Self::Docked => "docked",
        }
    }
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Static identity fields, derived once from the first robot status message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub model: String,
    pub sw_version: String,
}

impl DeviceIdentity {
    fn from_status(fields: &Map<String, Value>) -> Self {
        let model = fields
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string();

        let sw_version = match fields.get("version") {
            None | Some(Value::Null) => "Unknown".to_string(),
            Some(Value::String(version)) => version.clone(),
            Some(other) => other.to_string(),
        };

        Self { model, sw_version }
    }
}

/// The latest known state of one mower: a shallow union of the most recent
/// robot-status and rain-status messages, rain fields last.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusSnapshot {
    fields: Map<String, Value>,
}

impl StatusSnapshot {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    fn int(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    fn flag(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    pub fn mode(&self) -> Option<i64> {
        self.int("mode")
    }

    /// Battery level in percent.
    pub fn power(&self) -> Option<i64> {
        self.int("power")
    }

    /// Whether the mower sits in its docking station.
    pub fn station(&self) -> Option<bool> {
        self.flag("station")
    }

    /// Total area covered, in m².
    pub fn on_area(&self) -> Option<i64> {
        self.int("on_area")
    }

    pub fn on_min(&self) -> Option<i64> {
        self.int("on_min")
    }

    /// Total runtime in minutes.
    pub fn total_min(&self) -> Option<i64> {
        self.int("total_min")
    }

    /// Runtime of the current session in minutes.
    pub fn cur_min(&self) -> Option<i64> {
        self.int("cur_min")
    }

    /// Area covered in the current session, in m².
    pub fn cur_area(&self) -> Option<i64> {
        self.int("cur_area")
    }

    /// WiFi signal level in bars.
    pub fn wifi_lv(&self) -> Option<i64> {
        self.int("wifi_lv")
    }

    pub fn rain_en(&self) -> Option<bool> {
        self.flag("rain_en")
    }

    pub fn rain_status(&self) -> Option<i64> {
        self.int("rain_status")
    }

    /// Configured rain delay in minutes.
    pub fn rain_delay_set(&self) -> Option<i64> {
        self.int("rain_delay_set")
    }

    /// Remaining rain delay in minutes.
    pub fn rain_delay_left(&self) -> Option<i64> {
        self.int("rain_delay_left")
    }

    pub fn activity(&self) -> Option<Activity> {
        if self.fields.is_empty() {
            return None;
        }

        if self.station().unwrap_or(false) {
            return Some(Activity::Docked);
        }

        Some(match self.mode().unwrap_or(0) {
            MODE_MOWING | MODE_EDGE_CUT => Activity::Mowing,
            MODE_DOCK => Activity::Docked,
            _ => Activity::Paused,
        })
    }
}

/// Holds the latest decoded status for one mower.
///
/// The two message kinds are kept separately; an update to one never touches
/// fields from the other. Only the latest message per kind is retained.
#[derive(Debug, Default)]
pub struct StatusCache {
    robot: Option<Map<String, Value>>,
    rain: Option<Map<String, Value>>,
    identity: Option<DeviceIdentity>,
}

impl StatusCache {
    /// Ingest one inbound payload.
    ///
    /// Returns the re-merged snapshot after a robot-status or rain-status
    /// message was stored. Malformed payloads and unknown response codes are
    /// logged and dropped.
    pub fn ingest(&mut self, payload: &[u8]) -> Option<StatusSnapshot> {
        let data: Value = match serde_json::from_slice(payload) {
            Ok(data) => data,
            Err(err) => {
                log::warn!("Dropping malformed status payload: {err}");
                return None;
            }
        };

        let Value::Object(mut fields) = data else {
            log::warn!("Dropping non-object status payload");
            return None;
        };

        let Some(cmd) = fields.get("cmd").and_then(Value::as_i64) else {
            log::warn!("Dropping status payload without a command code");
            return None;
        };

        // routing metadata, not status
        fields.remove("cmd");

        match cmd {
            RESP_ROBOT_STATUS => {
                if self.identity.is_none() {
                    self.identity = Some(DeviceIdentity::from_status(&fields));
                }
                self.robot = Some(fields);
            }
            RESP_RAIN_STATUS => {
                self.rain = Some(fields);
            }
            other => {
                log::debug!("Ignoring response with command code {other}");
                return None;
            }
        }

        self.snapshot()
    }

    /// The current merged snapshot, or `None` if nothing was ever ingested.
    pub fn snapshot(&self) -> Option<StatusSnapshot> {
        if self.robot.is_none() && self.rain.is_none() {
            return None;
        }

        let mut fields = Map::new();
        if let Some(robot) = &self.robot {
            fields.extend(robot.clone());
        }
        if let Some(rain) = &self.rain {
            fields.extend(rain.clone());
        }

        Some(StatusSnapshot { fields })
    }

    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn ingest(cache: &mut StatusCache, value: Value) -> Option<StatusSnapshot> {
        cache.ingest(value.to_string().as_bytes())
    }

    #[test]
    fn test_empty_cache_has_no_snapshot() {
        assert_eq!(StatusCache::default().snapshot(), None);
    }

    #[test]
    fn test_merges_robot_and_rain_status() {
        let mut cache = StatusCache::default();

        let snapshot = ingest(
            &mut cache,
            json!({"cmd": 501, "mode": 1, "station": false, "power": 77}),
        )
        .unwrap();
        assert_eq!(snapshot.mode(), Some(1));
        assert_eq!(snapshot.station(), Some(false));
        assert_eq!(snapshot.power(), Some(77));
        assert_eq!(snapshot.rain_en(), None);

        let snapshot = ingest(&mut cache, json!({"cmd": 505, "rain_en": true, "rain_status": 0}))
            .unwrap();
        assert_eq!(snapshot.mode(), Some(1));
        assert_eq!(snapshot.station(), Some(false));
        assert_eq!(snapshot.power(), Some(77));
        assert_eq!(snapshot.rain_en(), Some(true));
        assert_eq!(snapshot.rain_status(), Some(0));
    }

    #[test]
    fn test_robot_update_keeps_rain_fields() {
        let mut cache = StatusCache::default();

        ingest(&mut cache, json!({"cmd": 501, "mode": 1, "power": 80}));
        ingest(&mut cache, json!({"cmd": 505, "rain_en": true, "rain_delay_left": 30}));

        // the new robot status no longer reports `power`
        let snapshot = ingest(&mut cache, json!({"cmd": 501, "mode": 2})).unwrap();
        assert_eq!(snapshot.mode(), Some(2));
        assert_eq!(snapshot.power(), None);
        assert_eq!(snapshot.rain_en(), Some(true));
        assert_eq!(snapshot.rain_delay_left(), Some(30));
    }

    #[test]
    fn test_rain_update_keeps_robot_fields() {
        let mut cache = StatusCache::default();

        ingest(&mut cache, json!({"cmd": 501, "mode": 1, "power": 80}));
        ingest(&mut cache, json!({"cmd": 505, "rain_en": true, "rain_delay_left": 30}));

        let snapshot = ingest(&mut cache, json!({"cmd": 505, "rain_en": false})).unwrap();
        assert_eq!(snapshot.mode(), Some(1));
        assert_eq!(snapshot.power(), Some(80));
        assert_eq!(snapshot.rain_en(), Some(false));
        assert_eq!(snapshot.rain_delay_left(), None);
    }

    #[test]
    fn test_malformed_payload_is_dropped() {
        let mut cache = StatusCache::default();
        ingest(&mut cache, json!({"cmd": 501, "mode": 1}));

        assert_eq!(cache.ingest(b"not json"), None);
        assert_eq!(cache.ingest(b"[1, 2, 3]"), None);
        assert_eq!(ingest(&mut cache, json!({"mode": 2})), None);
        assert_eq!(ingest(&mut cache, json!({"cmd": 502, "name": "x"})), None);

        // snapshot unchanged
        assert_eq!(cache.snapshot().unwrap().mode(), Some(1));
    }

    #[test]
    fn test_identity_derived_once() {
        let mut cache = StatusCache::default();
        assert_eq!(cache.identity(), None);

        ingest(
            &mut cache,
            json!({"cmd": 501, "mode": 0, "model": "RMA501M20V", "version": 142}),
        );
        let identity = cache.identity().unwrap().clone();
        assert_eq!(identity.model, "RMA501M20V");
        assert_eq!(identity.sw_version, "142");

        ingest(
            &mut cache,
            json!({"cmd": 501, "mode": 0, "model": "other", "version": 143}),
        );
        assert_eq!(cache.identity(), Some(&identity));
    }

    #[test]
    fn test_identity_defaults() {
        let mut cache = StatusCache::default();
        ingest(&mut cache, json!({"cmd": 501, "mode": 0}));

        let identity = cache.identity().unwrap();
        assert_eq!(identity.model, "Unknown");
        assert_eq!(identity.sw_version, "Unknown");
    }

    #[test]
    fn test_activity() {
        let mut cache = StatusCache::default();

        let snapshot = ingest(&mut cache, json!({"cmd": 501, "mode": 1, "station": false})).unwrap();
        assert_eq!(snapshot.activity(), Some(Activity::Mowing));

        let snapshot = ingest(&mut cache, json!({"cmd": 501, "mode": 4, "station": false})).unwrap();
        assert_eq!(snapshot.activity(), Some(Activity::Mowing));

        let snapshot = ingest(&mut cache, json!({"cmd": 501, "mode": 0, "station": false})).unwrap();
        assert_eq!(snapshot.activity(), Some(Activity::Paused));

        // station wins over mode
        let snapshot = ingest(&mut cache, json!({"cmd": 501, "mode": 1, "station": true})).unwrap();
        assert_eq!(snapshot.activity(), Some(Activity::Docked));

        assert_eq!(StatusSnapshot::default().activity(), None);
    }
}
