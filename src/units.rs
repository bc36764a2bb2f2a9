//! Static catalogs used when projecting native sensors.
//!
//! * [`lookup`] maps the unit strings found on native sensors to an STA
//!   `unitOfMeasurement`. The table is closed: symbols outside of it map to the
//!   [`NOT_SPECIFIED`] sentinel, which is what makes a Datastream an
//!   `OM_Observation` rather than an `OM_Measurement`.
//! * [`metadata_for`] maps a native `sensorType` to a page on the sensor wiki.

use serde::Serialize;

/// Name carried by the sentinel entry for unrecognized units.
pub const NOT_SPECIFIED: &str = "Not Specified";

/// Sent as Sensor metadata when the sensor type is not in the catalog.
pub const NO_METADATA: &str = "no metadata available";

const SENSOR_WIKI: &str = "https://sensors.wiki/sensor/detail";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitOfMeasurement {
    pub name: String,
    pub symbol: String,
    pub definition: String,
}

impl UnitOfMeasurement {
    pub fn is_specified(&self) -> bool {
        self.name != NOT_SPECIFIED
    }
}

// (symbols, name, definition)
const UNITS: &[(&[&str], &str, &str)] = &[
    (&["°C", "° C", "C"], "degree Celsius", "http://qudt.org/vocab/unit/DEG_C"),
    (&["°F"], "degree Fahrenheit", "http://qudt.org/vocab/unit/DEG_F"),
    (&["K"], "kelvin", "http://qudt.org/vocab/unit/K"),
    (&["%", "%RH", "% RH"], "percent", "http://qudt.org/vocab/unit/PERCENT"),
    (&["hPa"], "hectopascal", "http://qudt.org/vocab/unit/HectoPA"),
    (&["Pa"], "pascal", "http://qudt.org/vocab/unit/PA"),
    (&["mbar"], "millibar", "http://qudt.org/vocab/unit/MilliBAR"),
    (&["µg/m³", "µg/m3", "ug/m3"], "microgram per cubic metre", "http://qudt.org/vocab/unit/MicroGM-PER-M3"),
    (&["mg/m³", "mg/m3"], "milligram per cubic metre", "http://qudt.org/vocab/unit/MilliGM-PER-M3"),
    (&["ppm"], "parts per million", "http://qudt.org/vocab/unit/PPM"),
    (&["ppb"], "parts per billion", "http://qudt.org/vocab/unit/PPB"),
    (&["lx", "lux"], "lux", "http://qudt.org/vocab/unit/LUX"),
    (&["µW/cm²", "µW/cm2", "uW/cm2"], "microwatt per square centimetre", "http://qudt.org/vocab/unit/MicroW-PER-CentiM2"),
    (&["W/m²", "W/m2"], "watt per square metre", "http://qudt.org/vocab/unit/W-PER-M2"),
    (&["UV-Index", "UVI"], "UV index", "http://qudt.org/vocab/unit/UNITLESS"),
    (&["dB", "dB(A)", "dBA"], "decibel", "http://qudt.org/vocab/unit/DeciB"),
    (&["m/s"], "metre per second", "http://qudt.org/vocab/unit/M-PER-SEC"),
    (&["km/h"], "kilometre per hour", "http://qudt.org/vocab/unit/KiloM-PER-HR"),
    (&["mm"], "millimetre", "http://qudt.org/vocab/unit/MilliM"),
    (&["mm/h"], "millimetre per hour", "http://qudt.org/vocab/unit/MilliM-PER-HR"),
    (&["°"], "degree", "http://qudt.org/vocab/unit/DEG"),
    (&["V"], "volt", "http://qudt.org/vocab/unit/V"),
    (&["A"], "ampere", "http://qudt.org/vocab/unit/A"),
    (&["kOhm", "kΩ"], "kiloohm", "http://qudt.org/vocab/unit/KiloOHM"),
];

/// Total lookup: every symbol yields a unit, unknown ones the sentinel.
pub fn lookup(symbol: &str) -> UnitOfMeasurement {
    let trimmed = symbol.trim();
    UNITS
        .iter()
        .find(|(symbols, _, _)| symbols.contains(&trimmed))
        .map(|(symbols, name, definition)| UnitOfMeasurement {
            name: name.to_string(),
            symbol: symbols[0].to_string(),
            definition: definition.to_string(),
        })
        .unwrap_or_else(|| UnitOfMeasurement {
            name: NOT_SPECIFIED.to_string(),
            symbol: symbol.to_string(),
            definition: String::new(),
        })
}

const SENSOR_TYPES: &[&str] = &[
    "bme280", "bme680", "bmp180", "bmp280", "dht11", "dht22", "dps310", "hdc1008",
    "hdc1080", "pms5003", "pms7003", "scd30", "sds011", "sht31", "sht35", "smt50",
    "sps30", "tsl45315", "veml6070", "ltr329", "ds18b20",
];

/// Normalizes a native sensor type into the key used by the sensor wiki.
fn sensor_key(sensor_type: &str) -> String {
    // the two multi-word types the platform hands out
    match sensor_type.trim().to_lowercase().as_str() {
        "sds 011" | "nova sds 011" => "sds011".to_string(),
        "truebner smt50" | "smt 50" => "smt50".to_string(),
        other => other.replace([' ', '-', '_'], ""),
    }
}

pub fn metadata_for(sensor_type: &str) -> String {
    let key = sensor_key(sensor_type);
    if SENSOR_TYPES.contains(&key.as_str()) {
        format!("{SENSOR_WIKI}/{key}")
    } else {
        NO_METADATA.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_units_resolve() {
        let celsius = lookup("°C");
        assert_eq!(celsius.name, "degree Celsius");
        assert!(celsius.is_specified());
        assert_eq!(lookup(" hPa ").symbol, "hPa");
        assert_eq!(lookup("µg/m3").symbol, "µg/m³");
    }

    #[test]
    fn unknown_units_yield_the_sentinel() {
        for symbol in ["", "furlongs", "°c", "Bq/m³"] {
            let unit = lookup(symbol);
            assert_eq!(unit.name, NOT_SPECIFIED);
            assert_eq!(unit.symbol, symbol);
            assert!(!unit.is_specified());
        }
    }

    #[test]
    fn metadata_is_case_normalized() {
        assert_eq!(metadata_for("HDC1080"), "https://sensors.wiki/sensor/detail/hdc1080");
        assert_eq!(metadata_for("bmp280"), "https://sensors.wiki/sensor/detail/bmp280");
    }

    #[test]
    fn multi_word_sensor_types() {
        assert_eq!(metadata_for("SDS 011"), "https://sensors.wiki/sensor/detail/sds011");
        assert_eq!(metadata_for("Truebner SMT50"), "https://sensors.wiki/sensor/detail/smt50");
        assert_eq!(metadata_for("Homemade Thermistor"), NO_METADATA);
    }
}
