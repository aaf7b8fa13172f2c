//! Application message types carried on the framed stream.
//!
//! Messages are JSON objects discriminated by a `type` field:
//!
//! ```text
//! {"type":"sdp-offer","sdp":"v=0\r\n..."}          viewer → peer, once
//! {"type":"sdp-answer","sdp":"v=0\r\n..."}         peer → viewer, once
//! {"type":"detected-center","x":3.000,"y":0.000}  viewer → peer, per tick
//! {"type":"l2-error","val":1.4142135623730951}    peer → viewer
//! ```

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;

use crate::error::CarvizError;
use crate::vision::Centroid;

// ── Fixed3 ────────────────────────────────────────────────────────

/// A real number held in thousandths.
///
/// Always written with exactly three fractional digits (`3.000`,
/// `-0.005`). Accepts a JSON number or a numeric string when read,
/// since some peers send coordinates as formatted strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Fixed3(i64);

impl Fixed3 {
    /// Round `value` to the nearest thousandth, halves away from zero.
    pub fn from_f64(value: f64) -> Self {
        Self(round_decimal(value, 3))
    }

    /// Build directly from a count of thousandths.
    pub const fn from_thousandths(thousandths: i64) -> Self {
        Self(thousandths)
    }

    pub const fn thousandths(self) -> i64 {
        self.0
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

/// Fractional digits printed when reading a float's exact expansion.
/// Enough that no finite `f64` within 10^-19 of a half-unit is mistaken
/// for one at three or fewer digits.
const EXPANSION_DIGITS: usize = 32;

/// `value · 10^digits` rounded to an integer, halves away from zero.
///
/// Rounds on the exact decimal expansion of `value`, so `1.0005` (stored
/// just below the half) gives `1000` while `0.0625` (an exact half)
/// gives `63` at three digits. Saturates where the result leaves `i64`.
pub(crate) fn round_decimal(value: f64, digits: usize) -> i64 {
    let text = format!("{:.*}", EXPANSION_DIGITS, value.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let (kept, rest) = frac.split_at(digits.min(frac.len()));

    let Ok(mut magnitude) = format!("{whole}{kept}").parse::<i64>() else {
        return (value * 10f64.powi(digits as i32)).round() as i64;
    };
    if rest.as_bytes().first().is_some_and(|&d| d >= b'5') {
        magnitude = magnitude.saturating_add(1);
    }
    if value.is_sign_negative() {
        -magnitude
    } else {
        magnitude
    }
}

impl fmt::Display for Fixed3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:03}", abs / 1000, abs % 1000)
    }
}

impl Serialize for Fixed3 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = RawValue::from_string(self.to_string()).map_err(serde::ser::Error::custom)?;
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Fixed3 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Fixed3Visitor;

        impl Visitor<'_> for Fixed3Visitor {
            type Value = Fixed3;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number or a numeric string")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Fixed3, E> {
                if v.is_finite() {
                    Ok(Fixed3::from_f64(v))
                } else {
                    Err(E::custom("coordinate is not finite"))
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Fixed3, E> {
                Ok(Fixed3::from_f64(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Fixed3, E> {
                Ok(Fixed3::from_f64(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Fixed3, E> {
                let parsed: f64 = v.trim().parse().map_err(E::custom)?;
                self.visit_f64(parsed)
            }
        }

        deserializer.deserialize_any(Fixed3Visitor)
    }
}

// ── AppMessage ────────────────────────────────────────────────────

/// Every message understood on the carviz stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AppMessage {
    /// Session description offered by the viewer.
    #[serde(rename = "sdp-offer")]
    SdpOffer { sdp: String },

    /// Session description answered by the peer.
    #[serde(rename = "sdp-answer")]
    SdpAnswer { sdp: String },

    /// Centroid found in the current viewer frame.
    #[serde(rename = "detected-center")]
    DetectedCenter { x: Fixed3, y: Fixed3 },

    /// Distance between the reported centre and the true ball centre.
    #[serde(rename = "l2-error")]
    L2Error { val: f64 },
}

impl AppMessage {
    /// Telemetry report for a detected centroid.
    pub fn detected_center(centroid: Centroid) -> Self {
        let (x, y) = centroid.to_fixed();
        AppMessage::DetectedCenter { x, y }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            AppMessage::SdpOffer { .. } => MessageKind::SdpOffer,
            AppMessage::SdpAnswer { .. } => MessageKind::SdpAnswer,
            AppMessage::DetectedCenter { .. } => MessageKind::DetectedCenter,
            AppMessage::L2Error { .. } => MessageKind::L2Error,
        }
    }

    /// Serialize to compact JSON, without the boundary marker.
    pub fn to_json(&self) -> Result<Vec<u8>, CarvizError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse one JSON object.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

// ── MessageKind ───────────────────────────────────────────────────

/// Payload-free discriminant of [`AppMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    SdpOffer,
    SdpAnswer,
    DetectedCenter,
    L2Error,
}

impl MessageKind {
    /// The `type` tag used on the wire.
    pub const fn wire_name(self) -> &'static str {
        match self {
            MessageKind::SdpOffer => "sdp-offer",
            MessageKind::SdpAnswer => "sdp-answer",
            MessageKind::DetectedCenter => "detected-center",
            MessageKind::L2Error => "l2-error",
        }
    }

    /// Returns `true` for messages the viewer sends and never receives.
    pub fn is_viewer_outbound(self) -> bool {
        matches!(self, MessageKind::SdpOffer | MessageKind::DetectedCenter)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed3_formats_three_digits() {
        assert_eq!(Fixed3::from_f64(3.0).to_string(), "3.000");
        assert_eq!(Fixed3::from_f64(0.0).to_string(), "0.000");
        assert_eq!(Fixed3::from_f64(1.23456).to_string(), "1.235");
        assert_eq!(Fixed3::from_f64(-0.005).to_string(), "-0.005");
        assert_eq!(Fixed3::from_f64(123456.7).to_string(), "123456.700");
    }

    #[test]
    fn fixed3_rounds_the_stored_value() {
        // 1.0005 is stored as 1.000499999...
        assert_eq!(Fixed3::from_f64(1.0005).to_string(), "1.000");
        // exact binary halves go away from zero
        assert_eq!(Fixed3::from_f64(0.0625).to_string(), "0.063");
        assert_eq!(Fixed3::from_f64(-0.0625).to_string(), "-0.063");
        assert_eq!(Fixed3::from_f64(320.125).to_string(), "320.125");
        assert_eq!(Fixed3::from_f64(-0.0004).to_string(), "0.000");
    }

    #[test]
    fn round_decimal_edges() {
        assert_eq!(round_decimal(0.125, 2), 13);
        assert_eq!(round_decimal(3.14159, 2), 314);
        assert_eq!(round_decimal(f64::NAN, 3), 0);
        assert_eq!(round_decimal(f64::INFINITY, 3), i64::MAX);
        assert_eq!(round_decimal(1e300, 3), i64::MAX);
    }

    #[test]
    fn l2_error_value_survives_json() {
        for val in [3674.4285714285716, 0.1 + 0.2, 5e-324, f64::MAX, -1.0 / 3.0] {
            let msg = AppMessage::L2Error { val };
            let back = AppMessage::from_json(&msg.to_json().unwrap()).unwrap();
            assert_eq!(back, msg, "{val:e}");
        }
    }

    #[test]
    fn detected_center_wire_format() {
        let msg = AppMessage::DetectedCenter {
            x: Fixed3::from_f64(3.0),
            y: Fixed3::from_f64(0.0),
        };
        let json = String::from_utf8(msg.to_json().unwrap()).unwrap();
        assert_eq!(json, r#"{"type":"detected-center","x":3.000,"y":0.000}"#);
    }

    #[test]
    fn wire_names_match_tags() {
        let msgs = [
            AppMessage::SdpOffer { sdp: "o".into() },
            AppMessage::SdpAnswer { sdp: "a".into() },
            AppMessage::DetectedCenter {
                x: Fixed3::default(),
                y: Fixed3::default(),
            },
            AppMessage::L2Error { val: 1.5 },
        ];
        for msg in msgs {
            let value: serde_json::Value = serde_json::from_slice(&msg.to_json().unwrap()).unwrap();
            assert_eq!(value["type"], msg.kind().wire_name());
        }
    }

    #[test]
    fn accepts_string_coordinates() {
        let msg = AppMessage::from_json(br#"{"type":"detected-center","x":"320.500","y":"12"}"#)
            .unwrap();
        assert_eq!(
            msg,
            AppMessage::DetectedCenter {
                x: Fixed3::from_thousandths(320_500),
                y: Fixed3::from_thousandths(12_000),
            }
        );
    }

    #[test]
    fn l2_error_parses_integer_val() {
        let msg = AppMessage::from_json(br#"{"type":"l2-error","val":0}"#).unwrap();
        assert_eq!(msg, AppMessage::L2Error { val: 0.0 });
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(AppMessage::from_json(br#"{"type":"ice-candidate","candidate":""}"#).is_err());
        assert!(AppMessage::from_json(br#"{"sdp":"v=0"}"#).is_err());
    }

    #[test]
    fn viewer_outbound_kinds() {
        assert!(MessageKind::SdpOffer.is_viewer_outbound());
        assert!(MessageKind::DetectedCenter.is_viewer_outbound());
        assert!(!MessageKind::SdpAnswer.is_viewer_outbound());
        assert!(!MessageKind::L2Error.is_viewer_outbound());
    }
}
