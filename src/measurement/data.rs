use serde::Serialize;
use std::fmt;

/// One reading reported by the instrumentation application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub channel: u8,
    pub field_name: String,
    #[serde(rename = "adc")]
    pub adc_code: i32,
    pub value: f64,
    pub unit: String,
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Measurement(channel={}, field_name={}, adc={}, value={}, unit={})",
            self.channel, self.field_name, self.adc_code, self.value, self.unit
        )
    }
}

/// Row written to the CSV measurement log.
#[derive(Serialize)]
pub struct MeasurementRow<'a> {
    pub timestamp: String, // UTC ISO timestamp
    pub channel: u8,
    pub field_name: &'a str,
    pub adc: i32,
    pub value: f64,
    pub unit: &'a str,
}

impl<'a> MeasurementRow<'a> {
    pub fn new(timestamp: String, measurement: &'a Measurement) -> Self {
        MeasurementRow {
            timestamp,
            channel: measurement.channel,
            field_name: &measurement.field_name,
            adc: measurement.adc_code,
            value: measurement.value,
            unit: &measurement.unit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Measurement {
        Measurement {
            channel: 0,
            field_name: "corrente-bateria-bombordo".to_string(),
            adc_code: 7581,
            value: -0.29,
            unit: "A".to_string(),
        }
    }

    #[test]
    fn display_lists_all_fields() {
        assert_eq!(
            sample().to_string(),
            "Measurement(channel=0, field_name=corrente-bateria-bombordo, adc=7581, value=-0.29, unit=A)"
        );
    }

    #[test]
    fn serializes_adc_code_as_adc() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["adc"], 7581);
        assert_eq!(json["field_name"], "corrente-bateria-bombordo");
        assert!(json.get("adc_code").is_none());
    }
}
