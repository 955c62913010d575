use std::collections::HashMap;

use serde_json::Value;
use strum::IntoEnumIterator;

use super::command::{Command, DayPlan, Schedule, Weekday};

/// Names of the imperative intents an embedder can forward by string.
pub const INTENT_START_MOWING: &str = "start_mowing";
pub const INTENT_PAUSE: &str = "pause";
pub const INTENT_DOCK: &str = "dock";
pub const INTENT_EDGE_CUT: &str = "edge_cut";
pub const INTENT_SET_SCHEDULE: &str = "set_schedule";
pub const INTENT_SET_RAIN_DELAY: &str = "set_rain_delay";

const DEFAULT_RAIN_DELAY_MINUTES: u32 = 180;

#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("unknown intent: {0}")]
    Unknown(String),
    #[error("invalid arguments for {intent}: {source}")]
    InvalidArgs {
        intent: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A named imperative intent, parsed from the embedder's service surface and
/// forwarded into the command encoder.
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    StartMowing,
    Pause,
    Dock,
    EdgeCut,
    SetSchedule(Schedule),
    SetRainDelay { enabled: bool, delay_minutes: u32 },
}

impl Intent {
    /// Parse an intent by name with JSON arguments.
    ///
    /// Missing optional arguments fall back to the mower's defaults: schedule
    /// `auto`/`pause` off, `trimming` on, rain delay enabled for 180 minutes.
    pub fn parse(name: &str, args: &Value) -> Result<Self, IntentError> {
        match name {
            INTENT_START_MOWING => Ok(Self::StartMowing),
            INTENT_PAUSE => Ok(Self::Pause),
            INTENT_DOCK => Ok(Self::Dock),
            INTENT_EDGE_CUT => Ok(Self::EdgeCut),
            INTENT_SET_SCHEDULE => {
                let auto = args.get("auto").and_then(Value::as_bool).unwrap_or(false);
                let pause = args.get("pause").and_then(Value::as_bool).unwrap_or(false);

                let mut days = HashMap::new();
                for day in Weekday::iter() {
                    if let Some(plan) = args.get(day.as_input_key()) {
                        let plan: DayPlan = serde_json::from_value(plan.clone()).map_err(|source| {
                            IntentError::InvalidArgs {
                                intent: INTENT_SET_SCHEDULE,
                                source,
                            }
                        })?;
                        days.insert(day, plan);
                    }
                }

                Ok(Self::SetSchedule(Schedule { auto, pause, days }))
            }
            INTENT_SET_RAIN_DELAY => {
                let enabled = args.get("enabled").and_then(Value::as_bool).unwrap_or(true);
                let delay_minutes = args
                    .get("delay_minutes")
                    .and_then(Value::as_u64)
                    .and_then(|minutes| u32::try_from(minutes).ok())
                    .unwrap_or(DEFAULT_RAIN_DELAY_MINUTES);

                Ok(Self::SetRainDelay {
                    enabled,
                    delay_minutes,
                })
            }
            other => Err(IntentError::Unknown(other.to_string())),
        }
    }

    pub fn into_command(self) -> Command {
        match self {
            Self::StartMowing => Command::StartMowing,
            Self::Pause => Command::Pause,
            Self::Dock => Command::Dock,
            Self::EdgeCut => Command::EdgeCut,
            Self::SetSchedule(schedule) => Command::SetSchedule(schedule),
            Self::SetRainDelay {
                enabled,
                delay_minutes,
            } => Command::SetRainDelay {
                enabled,
                delay_minutes,
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_intents() {
        assert_eq!(
            Intent::parse("start_mowing", &Value::Null).unwrap(),
            Intent::StartMowing
        );
        assert_eq!(Intent::parse("pause", &Value::Null).unwrap(), Intent::Pause);
        assert_eq!(Intent::parse("dock", &Value::Null).unwrap(), Intent::Dock);
        assert_eq!(
            Intent::parse("edge_cut", &Value::Null).unwrap(),
            Intent::EdgeCut
        );
    }

    #[test]
    fn test_unknown_intent() {
        assert!(matches!(
            Intent::parse("fly_home", &Value::Null),
            Err(IntentError::Unknown(_))
        ));
    }

    #[test]
    fn test_rain_delay_defaults() {
        assert_eq!(
            Intent::parse("set_rain_delay", &json!({})).unwrap(),
            Intent::SetRainDelay {
                enabled: true,
                delay_minutes: 180
            }
        );
        assert_eq!(
            Intent::parse("set_rain_delay", &json!({"enabled": false, "delay_minutes": 60}))
                .unwrap(),
            Intent::SetRainDelay {
                enabled: false,
                delay_minutes: 60
            }
        );
    }

    #[test]
    fn test_set_schedule() {
        let intent = Intent::parse(
            "set_schedule",
            &json!({
                "auto": true,
                "mon": {"slots": [{"start": 600, "end": 1200}]},
                "sat": {"slots": [], "trimming": false},
            }),
        )
        .unwrap();

        let Intent::SetSchedule(schedule) = intent else {
            panic!("expected a schedule");
        };
        assert!(schedule.auto);
        assert!(!schedule.pause);
        assert_eq!(schedule.days.len(), 2);
        assert!(schedule.days[&Weekday::Monday].trimming);
        assert!(!schedule.days[&Weekday::Saturday].trimming);
    }

    #[test]
    fn test_set_schedule_rejects_bad_day() {
        assert!(matches!(
            Intent::parse("set_schedule", &json!({"mon": {"slots": [{"start": 600}]}})),
            Err(IntentError::InvalidArgs { .. })
        ));
    }
}
