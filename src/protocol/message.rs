//! Classification of decoded radio messages.
//!
//! The field device sends two kinds of text messages:
//! - `IGNORADO:<anything>` when it dropped the last command it received
//! - `temp:25.3,hum:40.0,ldr:512.7` style composite sensor reports

use std::fmt;

use serde::Serialize;

/// Prefix of the notice sent when the device drops a command.
pub const IGNORED_PREFIX: &str = "IGNORADO:";

/// A single sensor value.
///
/// Values that do not parse as a finite number are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    /// Numeric reading.
    Number(f64),
    /// Reading that could not be parsed as a number.
    Text(String),
}

impl SensorValue {
    /// Parses a raw value, falling back to text.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<f64>() {
            // JSON has no encoding for NaN or infinities
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(raw.to_string()),
        }
    }

    /// Returns the numeric value if present.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Normalized sensor keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKey {
    /// Air temperature.
    Temperature,
    /// Relative humidity.
    Humidity,
    /// Light level.
    Light,
}

impl SensorKey {
    /// Maps a raw (lowercased) key to a sensor by substring.
    #[must_use]
    pub fn from_raw(key: &str) -> Option<Self> {
        if key.contains("temp") {
            Some(Self::Temperature)
        } else if key.contains("hum") {
            Some(Self::Humidity)
        } else if key.contains("ldr") || key.contains("luz") {
            Some(Self::Light)
        } else {
            None
        }
    }

    /// Returns the key used in published JSON.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperatura",
            Self::Humidity => "humedad",
            Self::Light => "luz",
        }
    }
}

/// Accumulated sensor reading, serialized with only the present keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorReading {
    /// Temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperatura: Option<SensorValue>,
    /// Humidity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humedad: Option<SensorValue>,
    /// Light level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub luz: Option<SensorValue>,
}

impl SensorReading {
    /// Sets the value for a sensor.
    pub fn set(&mut self, key: SensorKey, value: SensorValue) {
        let slot = match key {
            SensorKey::Temperature => &mut self.temperatura,
            SensorKey::Humidity => &mut self.humedad,
            SensorKey::Light => &mut self.luz,
        };
        *slot = Some(value);
    }

    /// Returns the value for a sensor.
    #[must_use]
    pub const fn get(&self, key: SensorKey) -> Option<&SensorValue> {
        match key {
            SensorKey::Temperature => self.temperatura.as_ref(),
            SensorKey::Humidity => self.humedad.as_ref(),
            SensorKey::Light => self.luz.as_ref(),
        }
    }

    /// Returns true if no sensor is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.temperatura.is_none() && self.humedad.is_none() && self.luz.is_none()
    }

    /// Serializes the reading as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A composite sensor message.
///
/// `updates` holds the accumulated reading after each key/value item of the
/// message, as long as the reading was non-empty at that point. The last
/// entry is the complete reading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorFrame {
    updates: Vec<SensorReading>,
}

impl SensorFrame {
    /// Parses a composite message.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut reading = SensorReading::default();
        let mut updates = Vec::new();

        for item in text.split(',') {
            let Some((key, value)) = item.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();

            if let Some(sensor) = SensorKey::from_raw(&key) {
                let value = SensorValue::parse(value.trim());
                tracing::trace!("sensor {} = {}", sensor.as_str(), value);
                reading.set(sensor, value);
            }

            if !reading.is_empty() {
                updates.push(reading.clone());
            }
        }

        Self { updates }
    }

    /// Returns every intermediate reading, in order.
    #[must_use]
    pub fn updates(&self) -> &[SensorReading] {
        &self.updates
    }

    /// Returns the complete reading, if any key matched.
    #[must_use]
    pub fn reading(&self) -> Option<&SensorReading> {
        self.updates.last()
    }

    /// Returns true if no key matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Classified radio message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// The device dropped the last command.
    Ignored,
    /// Composite sensor report.
    SensorComposite(SensorFrame),
    /// Anything else.
    Unrecognized,
}

/// Classifies a decoded message.
#[must_use]
pub fn classify(text: &str) -> Message {
    if text.starts_with(IGNORED_PREFIX) {
        Message::Ignored
    } else if text.contains(',') && text.contains(':') {
        Message::SensorComposite(SensorFrame::parse(text))
    } else {
        Message::Unrecognized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(reading: &SensorReading, key: SensorKey) -> Option<f64> {
        reading.get(key).and_then(SensorValue::as_f64)
    }

    #[test]
    fn test_classify_ignored() {
        assert_eq!(classify("IGNORADO:"), Message::Ignored);
        assert_eq!(classify("IGNORADO:B:1"), Message::Ignored);
        assert_eq!(classify("IGNORADO:temp:1,hum:2"), Message::Ignored);
    }

    #[test]
    fn test_classify_unrecognized() {
        assert_eq!(classify("hello"), Message::Unrecognized);
        assert_eq!(classify("temp:25.3"), Message::Unrecognized);
        assert_eq!(classify("a,b"), Message::Unrecognized);
        assert_eq!(classify("ignorado:x"), Message::Unrecognized);
    }

    #[test]
    fn test_composite_progressive_updates() {
        let Message::SensorComposite(frame) = classify("temp:25.3,hum:40.0,ldr:512.7") else {
            panic!("expected composite message");
        };

        let updates = frame.updates();
        assert_eq!(updates.len(), 3);

        assert_eq!(number(&updates[0], SensorKey::Temperature), Some(25.3));
        assert!(updates[0].humedad.is_none());
        assert!(updates[0].luz.is_none());

        assert_eq!(number(&updates[1], SensorKey::Humidity), Some(40.0));
        assert!(updates[1].luz.is_none());

        let full = frame.reading().unwrap();
        assert_eq!(number(full, SensorKey::Temperature), Some(25.3));
        assert_eq!(number(full, SensorKey::Humidity), Some(40.0));
        assert_eq!(number(full, SensorKey::Light), Some(512.7));
    }

    #[test]
    fn test_composite_key_matching() {
        let frame = SensorFrame::parse(" Temperature : 20 ,HUMIDITY:55,Luz:3");
        let full = frame.reading().unwrap();
        assert_eq!(number(full, SensorKey::Temperature), Some(20.0));
        assert_eq!(number(full, SensorKey::Humidity), Some(55.0));
        assert_eq!(number(full, SensorKey::Light), Some(3.0));
    }

    #[test]
    fn test_composite_unmatched_keys() {
        let frame = SensorFrame::parse("foo:1,bar:2");
        assert!(frame.is_empty());
        assert!(frame.reading().is_none());

        // Unmatched items after a match still re-emit the accumulated reading
        let frame = SensorFrame::parse("temp:1,foo:2,noise");
        assert_eq!(frame.updates().len(), 2);
        assert_eq!(frame.updates()[0], frame.updates()[1]);
    }

    #[test]
    fn test_composite_splits_on_first_colon() {
        let frame = SensorFrame::parse("temp:21:5,hum:3");
        let full = frame.reading().unwrap();
        assert_eq!(
            full.temperatura,
            Some(SensorValue::Text("21:5".to_string()))
        );
    }

    #[test]
    fn test_composite_text_value() {
        let frame = SensorFrame::parse("temp:err,hum:40");
        let full = frame.reading().unwrap();
        assert_eq!(full.temperatura, Some(SensorValue::Text("err".to_string())));
        assert_eq!(full.to_json().unwrap(), r#"{"temperatura":"err","humedad":40.0}"#);
    }

    #[test]
    fn test_non_finite_values_kept_as_text() {
        let frame = SensorFrame::parse("temp:nan,hum:inf,ldr:-infinity");
        let full = frame.reading().unwrap();
        assert_eq!(full.temperatura, Some(SensorValue::Text("nan".to_string())));
        assert_eq!(
            full.to_json().unwrap(),
            r#"{"temperatura":"nan","humedad":"inf","luz":"-infinity"}"#
        );
    }

    #[test]
    fn test_value_display() {
        assert_eq!(SensorValue::parse("25.5").to_string(), "25.5");
        assert_eq!(SensorValue::parse("err").to_string(), "err");
        assert_eq!(SensorKey::from_raw("ldr").map(|k| k.as_str()), Some("luz"));
    }

    #[test]
    fn test_reading_json() {
        let mut reading = SensorReading::default();
        assert!(reading.is_empty());
        assert_eq!(reading.to_json().unwrap(), "{}");

        reading.set(SensorKey::Light, SensorValue::Number(512.7));
        reading.set(SensorKey::Temperature, SensorValue::Number(25.3));
        assert_eq!(
            reading.to_json().unwrap(),
            r#"{"temperatura":25.3,"luz":512.7}"#
        );
    }
}
