use std::collections::HashMap;
use std::fmt::Formatter;

use serde_json::{json, Map, Value};
use strum::IntoEnumIterator;

/// Command codes understood by the mower.
pub const CMD_SET_MODE: i64 = 101;
pub const CMD_SET_SCHEDULE: i64 = 103;
pub const CMD_SET_RAIN_DELAY: i64 = 105;
pub const CMD_STATUS_REQUEST: i64 = 200;
pub const CMD_RAIN_STATUS_REQUEST: i64 = 205;

/// Response codes sent by the mower.
pub const RESP_ROBOT_STATUS: i64 = 501;
pub const RESP_RAIN_STATUS: i64 = 505;

/// Working modes accepted by [`CMD_SET_MODE`].
pub const MODE_PAUSE: i64 = 0;
pub const MODE_MOWING: i64 = 1;
pub const MODE_DOCK: i64 = 2;
pub const MODE_EDGE_CUT: i64 = 4;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{day} schedule slot has a non-integer {field}: {value}")]
    InvalidSlot {
        day: Weekday,
        field: &'static str,
        value: Value,
    },
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, strum::EnumIter)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Key used in the schedule command payload.
    pub fn as_wire_key(&self) -> &str {
        match self {
            Self::Monday => "Mon",
            Self::Tuesday => "Tue",
            Self::Wednesday => "Wed",
            Self::Thursday => "Thu",
            Self::Friday => "Fri",
            Self::Saturday => "Sat",
            Self::Sunday => "Sun",
        }
    }

    /// Key accepted in intent arguments.
    pub fn as_input_key(&self) -> &str {
        match self {
            Self::Monday => "mon",
            Self::Tuesday => "tue",
            Self::Wednesday => "wed",
            Self::Thursday => "thu",
            Self::Friday => "fri",
            Self::Saturday => "sat",
            Self::Sunday => "sun",
        }
    }
}

impl AsRef<str> for Weekday {
    fn as_ref(&self) -> &str {
        self.as_wire_key()
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// One cutting window within a day, as supplied by the caller.
///
/// `start` and `end` are kept raw until encoding; integer numbers pass
/// through, integer strings are parsed, anything else fails the whole
/// command.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct SlotInput {
    pub start: Value,
    pub end: Value,
}

/// Cutting plan for a single day.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct DayPlan {
    #[serde(default)]
    pub slots: Vec<SlotInput>,
    #[serde(default = "default_trimming")]
    pub trimming: bool,
}

impl Default for DayPlan {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            trimming: default_trimming(),
        }
    }
}

fn default_trimming() -> bool {
    true
}

/// Weekly cutting schedule. Days without a plan are sent as empty objects.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schedule {
    pub auto: bool,
    pub pause: bool,
    pub days: HashMap<Weekday, DayPlan>,
}

/// High-level commands, encoded into the fixed JSON shapes the mower expects.
///
/// Encoding only guarantees a well-formed payload; the protocol is
/// fire-and-forget, so device-side rejection is invisible here.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    StartMowing,
    Pause,
    Dock,
    EdgeCut,
    StatusRequest,
    RainStatusRequest,
    SetSchedule(Schedule),
    SetRainDelay { enabled: bool, delay_minutes: u32 },
}

impl Command {
    pub fn encode(&self) -> Result<CommandMessage, CommandError> {
        let mut fields = Map::new();

        match self {
            Self::StartMowing => {
                fields.insert("cmd".into(), CMD_SET_MODE.into());
                fields.insert("mode".into(), MODE_MOWING.into());
            }
            Self::Pause => {
                fields.insert("cmd".into(), CMD_SET_MODE.into());
                fields.insert("mode".into(), MODE_PAUSE.into());
            }
            Self::Dock => {
                fields.insert("cmd".into(), CMD_SET_MODE.into());
                fields.insert("mode".into(), MODE_DOCK.into());
            }
            Self::EdgeCut => {
                fields.insert("cmd".into(), CMD_SET_MODE.into());
                fields.insert("mode".into(), MODE_EDGE_CUT.into());
            }
            Self::StatusRequest => {
                fields.insert("cmd".into(), CMD_STATUS_REQUEST.into());
            }
            Self::RainStatusRequest => {
                fields.insert("cmd".into(), CMD_RAIN_STATUS_REQUEST.into());
            }
            Self::SetSchedule(schedule) => {
                fields.insert("cmd".into(), CMD_SET_SCHEDULE.into());
                fields.insert("auto".into(), schedule.auto.into());
                fields.insert("pause".into(), schedule.pause.into());

                for day in Weekday::iter() {
                    let entry = match schedule.days.get(&day) {
                        Some(plan) => {
                            let slice = plan
                                .slots
                                .iter()
                                .map(|slot| {
                                    Ok(json!({
                                        "start": coerce_slot_time(day, "start", &slot.start)?,
                                        "end": coerce_slot_time(day, "end", &slot.end)?,
                                    }))
                                })
                                .collect::<Result<Vec<_>, CommandError>>()?;

                            json!({
                                "slice": slice,
                                "trimming": plan.trimming,
                            })
                        }
                        None => Value::Object(Map::new()),
                    };
                    fields.insert(day.as_wire_key().into(), entry);
                }
            }
            Self::SetRainDelay {
                enabled,
                delay_minutes,
            } => {
                fields.insert("cmd".into(), CMD_SET_RAIN_DELAY.into());
                fields.insert("rain_en".into(), (*enabled).into());
                fields.insert("rain_delay_set".into(), (*delay_minutes).into());
            }
        }

        Ok(CommandMessage(fields))
    }
}

fn coerce_slot_time(day: Weekday, field: &'static str, value: &Value) -> Result<i64, CommandError> {
    let invalid = || CommandError::InvalidSlot {
        day,
        field,
        value: value.clone(),
    };

    match value {
        Value::Number(number) => number.as_i64().ok_or_else(invalid),
        Value::String(text) => text.trim().parse().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// A single outbound command payload: a JSON object with an integer `cmd`
/// code plus command-specific fields.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct CommandMessage(Map<String, Value>);

impl CommandMessage {
    pub fn cmd(&self) -> Option<i64> {
        self.0.get("cmd").and_then(Value::as_i64)
    }

    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.0)
    }
}

impl From<CommandMessage> for Value {
    fn from(message: CommandMessage) -> Self {
        Value::Object(message.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn encoded(command: Command) -> Value {
        command.encode().unwrap().into()
    }

    #[test]
    fn test_mode_commands() {
        assert_eq!(encoded(Command::StartMowing), json!({"cmd": 101, "mode": 1}));
        assert_eq!(encoded(Command::Pause), json!({"cmd": 101, "mode": 0}));
        assert_eq!(encoded(Command::Dock), json!({"cmd": 101, "mode": 2}));
        assert_eq!(encoded(Command::EdgeCut), json!({"cmd": 101, "mode": 4}));
    }

    #[test]
    fn test_request_commands() {
        assert_eq!(encoded(Command::StatusRequest), json!({"cmd": 200}));
        assert_eq!(encoded(Command::RainStatusRequest), json!({"cmd": 205}));
    }

    #[test]
    fn test_rain_delay() {
        assert_eq!(
            encoded(Command::SetRainDelay {
                enabled: true,
                delay_minutes: 180
            }),
            json!({"cmd": 105, "rain_en": true, "rain_delay_set": 180})
        );
    }

    #[test]
    fn test_schedule_emits_all_days() {
        let mut days = HashMap::new();
        days.insert(
            Weekday::Monday,
            DayPlan {
                slots: vec![SlotInput {
                    start: json!("600"),
                    end: json!(1200),
                }],
                trimming: false,
            },
        );

        assert_eq!(
            encoded(Command::SetSchedule(Schedule {
                auto: true,
                pause: false,
                days,
            })),
            json!({
                "cmd": 103,
                "auto": true,
                "pause": false,
                "Mon": {
                    "slice": [{"start": 600, "end": 1200}],
                    "trimming": false,
                },
                "Tue": {},
                "Wed": {},
                "Thu": {},
                "Fri": {},
                "Sat": {},
                "Sun": {},
            })
        );
    }

    #[test]
    fn test_schedule_rejects_bad_slot() {
        let mut days = HashMap::new();
        days.insert(
            Weekday::Friday,
            DayPlan {
                slots: vec![SlotInput {
                    start: json!("six"),
                    end: json!(1200),
                }],
                trimming: true,
            },
        );

        let err = Command::SetSchedule(Schedule {
            auto: false,
            pause: false,
            days,
        })
        .encode()
        .unwrap_err();

        assert!(matches!(
            err,
            CommandError::InvalidSlot {
                day: Weekday::Friday,
                field: "start",
                ..
            }
        ));
    }

    #[test]
    fn test_schedule_rejects_float_slot() {
        let mut days = HashMap::new();
        days.insert(
            Weekday::Sunday,
            DayPlan {
                slots: vec![SlotInput {
                    start: json!(600),
                    end: json!(6.5),
                }],
                trimming: true,
            },
        );

        assert!(Command::SetSchedule(Schedule {
            auto: false,
            pause: false,
            days,
        })
        .encode()
        .is_err());
    }
}
