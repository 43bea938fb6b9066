//! Alert registry: the named collection of sensors built from configuration.

use indexmap::IndexMap;
use serde_yaml::Value;

use crate::core::config::{RawConfig, SensorConfig, GLOBAL_KEY};
use crate::core::resolver::SharedResolver;
use crate::core::sensor::Sensor;
use crate::error::{PrudenceError, Result};

#[derive(Debug, Default)]
pub struct AlertRegistry {
    sensors: IndexMap<String, Sensor>,
}

impl AlertRegistry {
    /// Build every sensor except `global` and entries with `enabled: false`.
    ///
    /// A malformed entry aborts the build; a probe that cannot be resolved
    /// only disables its own sensor.
    pub fn build(config: &RawConfig, resolver: SharedResolver) -> Result<Self> {
        let mut sensors = IndexMap::new();

        for (name, params) in config {
            if name == GLOBAL_KEY {
                continue;
            }
            let sensor_config: SensorConfig = serde_yaml::from_value(Value::Mapping(params.clone()))
                .map_err(|e| PrudenceError::config(format!("{}: {}", name, e)))?;
            if !sensor_config.enabled {
                log::debug!("{}: disabled in configuration", name);
                continue;
            }
            let sensor = Sensor::from_config(name, &sensor_config, resolver.clone())?;
            sensors.insert(name.clone(), sensor);
        }

        Ok(Self { sensors })
    }

    pub fn insert<S: Into<String>>(&mut self, name: S, sensor: Sensor) {
        self.sensors.insert(name.into(), sensor);
    }

    /// Drop the named sensors (e.g. `--disable` on the command line)
    pub fn exclude<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            if self.sensors.shift_remove(name.as_ref()).is_none() {
                log::warn!("Cannot disable unknown alert '{}'", name.as_ref());
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Sensor> {
        self.sensors.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Sensor> {
        self.sensors.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Sensor)> {
        self.sensors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Sensor)> {
        self.sensors.iter_mut()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sensors.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}
