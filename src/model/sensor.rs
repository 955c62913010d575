use std::fmt::Formatter;

use super::status::StatusSnapshot;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    Total,
    TotalIncreasing,
}

/// The fixed set of readable values derivable from a [`StatusSnapshot`].
///
/// Each variant carries its display metadata and its extraction rule.
#[derive(Copy, Clone, Eq, PartialEq, Debug, strum::EnumIter)]
pub enum Sensor {
    Battery,
    AreaCovered,
    CurrentArea,
    RuntimeCurrent,
    RuntimeTotal,
    WifiSignal,
}

impl Sensor {
    pub fn key(&self) -> &str {
        match self {
            Self::Battery => "battery",
            Self::AreaCovered => "area_covered",
            Self::CurrentArea => "current_area",
            Self::RuntimeCurrent => "runtime_current",
            Self::RuntimeTotal => "runtime_total",
            Self::WifiSignal => "wifi_signal",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Battery => "Battery",
            Self::AreaCovered => "Area Covered",
            Self::CurrentArea => "Current Area",
            Self::RuntimeCurrent => "Current Runtime",
            Self::RuntimeTotal => "Total Runtime",
            Self::WifiSignal => "WiFi Signal",
        }
    }

    pub fn icon(&self) -> &str {
        match self {
            Self::Battery => "mdi:battery",
            Self::AreaCovered => "mdi:ruler-square",
            Self::CurrentArea => "mdi:map-marker-radius",
            Self::RuntimeCurrent | Self::RuntimeTotal => "mdi:timer",
            Self::WifiSignal => "mdi:wifi",
        }
    }

    pub fn unit(&self) -> Option<&str> {
        match self {
            Self::Battery => Some("%"),
            Self::AreaCovered | Self::CurrentArea => Some("m²"),
            Self::RuntimeCurrent | Self::RuntimeTotal => Some("min"),
            Self::WifiSignal => Some("bars"),
        }
    }

    pub fn device_class(&self) -> Option<&str> {
        match self {
            Self::Battery => Some("battery"),
            _ => None,
        }
    }

    pub fn state_class(&self) -> StateClass {
        match self {
            Self::AreaCovered | Self::RuntimeTotal => StateClass::TotalIncreasing,
            _ => StateClass::Measurement,
        }
    }

    /// Extract this sensor's value from a snapshot.
    pub fn value(&self, snapshot: &StatusSnapshot) -> Option<i64> {
        match self {
            Self::Battery => snapshot.power(),
            Self::AreaCovered => snapshot.on_area(),
            Self::CurrentArea => snapshot.cur_area(),
            Self::RuntimeCurrent => snapshot.cur_min(),
            Self::RuntimeTotal => snapshot.total_min(),
            Self::WifiSignal => snapshot.wifi_lv(),
        }
    }
}

impl AsRef<str> for Sensor {
    fn as_ref(&self) -> &str {
        self.key()
    }
}

impl std::fmt::Display for Sensor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}
