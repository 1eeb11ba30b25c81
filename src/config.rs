// Copyright (c) 2026 rezky_nightky

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::palette::Rgb;

pub const DEFAULT_SPEED: f32 = 2.0;
pub const DEFAULT_SIZE: f32 = 3.0;
pub const DEFAULT_COUNT: u32 = 50;
pub const DEFAULT_COLOR: &str = "#ffffff";
pub const DEFAULT_CUSTOM_TEXT: &str = "❄";

pub const SPEED_RANGE: (f32, f32) = (0.1, 20.0);
pub const SIZE_RANGE: (f32, f32) = (0.1, 20.0);
pub const WIND_RANGE: (f32, f32) = (-10.0, 10.0);
pub const OPACITY_RANGE: (f32, f32) = (0.01, 1.0);
pub const MAX_COUNT: u32 = 2000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleKind {
    #[default]
    Snow,
    Star,
    Leaf,
    Flower,
    Rain,
    RainGlass,
    Custom,
    Image,
}

impl ParticleKind {
    pub const ALL: [ParticleKind; 8] = [
        ParticleKind::Snow,
        ParticleKind::Star,
        ParticleKind::Leaf,
        ParticleKind::Flower,
        ParticleKind::Rain,
        ParticleKind::RainGlass,
        ParticleKind::Custom,
        ParticleKind::Image,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParticleKind::Snow => "snow",
            ParticleKind::Star => "star",
            ParticleKind::Leaf => "leaf",
            ParticleKind::Flower => "flower",
            ParticleKind::Rain => "rain",
            ParticleKind::RainGlass => "rain_glass",
            ParticleKind::Custom => "custom",
            ParticleKind::Image => "image",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ParticleKind::Snow => "Soft glowing snowflakes",
            ParticleKind::Star => "Twinkling four-point stars",
            ParticleKind::Leaf => "Tumbling leaves",
            ParticleKind::Flower => "Drifting flower petals",
            ParticleKind::Rain => "Fast wind-sheared rain with splashes",
            ParticleKind::RainGlass => "Drops trickling down a window pane",
            ParticleKind::Custom => "Any glyph or emoji (see --text)",
            ParticleKind::Image => "An image file (see --image)",
        }
    }

    pub fn is_rain(self) -> bool {
        matches!(self, ParticleKind::Rain)
    }

    pub fn is_rain_variant(self) -> bool {
        matches!(self, ParticleKind::Rain | ParticleKind::RainGlass)
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&k| k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ParticleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParticleKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "snow" => Ok(ParticleKind::Snow),
            "star" | "stars" => Ok(ParticleKind::Star),
            "leaf" | "leaves" => Ok(ParticleKind::Leaf),
            "flower" | "petal" | "petals" => Ok(ParticleKind::Flower),
            "rain" => Ok(ParticleKind::Rain),
            "rain_glass" | "rainglass" | "glass" => Ok(ParticleKind::RainGlass),
            "custom" | "text" => Ok(ParticleKind::Custom),
            "image" => Ok(ParticleKind::Image),
            _ => Err(format!("invalid type: {} (see --list-types)", s)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: ParticleKind,
    pub speed: f32,
    pub size: f32,
    pub count: u32,
    pub wind: f32,
    pub opacity: f32,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_image: Option<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: ParticleKind::Snow,
            speed: DEFAULT_SPEED,
            size: DEFAULT_SIZE,
            count: DEFAULT_COUNT,
            wind: 0.0,
            opacity: 1.0,
            color: DEFAULT_COLOR.to_string(),
            custom_text: None,
            custom_image: None,
        }
    }
}

fn clamp_field(name: &str, v: f32, default: f32, (lo, hi): (f32, f32)) -> f32 {
    if !v.is_finite() {
        log::warn!("config {name}={v} is not finite, using {default}");
        return default;
    }
    if v < lo || v > hi {
        let c = v.clamp(lo, hi);
        log::warn!("config {name}={v} out of range, clamped to {c}");
        return c;
    }
    v
}

impl Configuration {
    /// Every field is optional; wrong types and unknown kinds keep their defaults.
    pub fn from_json_value(value: &Value) -> Self {
        let mut config = Self::default();
        let Some(obj) = value.as_object() else {
            if let Some(n) = value.as_u64() {
                config.count = n.min(u32::MAX as u64) as u32;
            }
            return config.sanitized();
        };

        // Saturate before narrowing so huge finite values clamp instead of
        // turning into infinities.
        macro_rules! number {
            ($field:ident, $key:expr) => {
                if let Some(n) = obj.get($key).and_then(Value::as_f64) {
                    config.$field = n.clamp(f32::MIN as f64, f32::MAX as f64) as f32;
                }
            };
        }

        if let Some(b) = obj.get("enabled").and_then(Value::as_bool) {
            config.enabled = b;
        }
        if let Some(s) = obj.get("type").and_then(Value::as_str) {
            match s.parse() {
                Ok(kind) => config.kind = kind,
                Err(e) => log::warn!("config {e}, keeping {}", config.kind),
            }
        }
        number!(speed, "speed");
        number!(size, "size");
        number!(wind, "wind");
        number!(opacity, "opacity");
        if let Some(n) = obj.get("count").and_then(Value::as_f64) {
            config.count = if n.is_finite() {
                n.round().clamp(0.0, u32::MAX as f64) as u32
            } else {
                DEFAULT_COUNT
            };
        }
        if let Some(s) = obj.get("color").and_then(Value::as_str) {
            config.color = s.to_string();
        }
        config.custom_text = obj
            .get("customText")
            .and_then(Value::as_str)
            .map(str::to_string);
        config.custom_image = obj
            .get("customImage")
            .and_then(Value::as_str)
            .map(str::to_string);

        config.sanitized()
    }

    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(s)?;
        Ok(Self::from_json_value(&value))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn sanitized(mut self) -> Self {
        self.speed = clamp_field("speed", self.speed, DEFAULT_SPEED, SPEED_RANGE);
        self.size = clamp_field("size", self.size, DEFAULT_SIZE, SIZE_RANGE);
        self.wind = clamp_field("wind", self.wind, 0.0, WIND_RANGE);
        self.opacity = clamp_field("opacity", self.opacity, 1.0, OPACITY_RANGE);
        if self.count > MAX_COUNT {
            log::warn!("config count={} out of range, clamped to {MAX_COUNT}", self.count);
            self.count = MAX_COUNT;
        }
        if Rgb::parse(&self.color).is_none() {
            log::warn!("config color {:?} is not a color, using white", self.color);
            self.color = DEFAULT_COLOR.to_string();
        }
        self
    }

    pub fn rgb(&self) -> Rgb {
        Rgb::parse_or_white(&self.color)
    }

    pub fn glyph(&self) -> char {
        self.custom_text
            .as_deref()
            .and_then(|s| s.trim().chars().next())
            .unwrap_or('❄')
    }

    pub fn image_path(&self) -> Option<&str> {
        let raw = self.custom_image.as_deref()?.trim();
        let path = raw.strip_prefix("file://").unwrap_or(raw);
        (!path.is_empty()).then_some(path)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_fields_keep_defaults() {
        let c = Configuration::from_json_value(&json!({ "enabled": true, "count": 80 }));
        assert_eq!(
            c,
            Configuration {
                enabled: true,
                count: 80,
                ..Configuration::default()
            }
        );
    }

    #[test]
    fn out_of_range_values_clamp_to_nearest_bound() {
        let c = Configuration::from_json_value(&json!({
            "speed": -4.0,
            "size": 999.0,
            "wind": -30.0,
            "opacity": 0.0,
            "count": 1.0e9,
        }));
        assert_eq!(c.speed, SPEED_RANGE.0);
        assert_eq!(c.size, SIZE_RANGE.1);
        assert_eq!(c.wind, WIND_RANGE.0);
        assert_eq!(c.opacity, OPACITY_RANGE.0);
        assert_eq!(c.count, MAX_COUNT);
    }

    #[test]
    fn wrong_types_and_unknown_kind_are_ignored() {
        let c = Configuration::from_json_value(&json!({
            "type": "hail",
            "speed": "fast",
            "color": "not-a-color",
            "enabled": "yes",
        }));
        assert_eq!(c.kind, ParticleKind::Snow);
        assert_eq!(c.speed, DEFAULT_SPEED);
        assert_eq!(c.color, DEFAULT_COLOR);
        assert!(!c.enabled);
    }

    #[test]
    fn values_beyond_f32_range_clamp_to_nearest_bound() {
        let c = Configuration::from_json_value(&json!({
            "speed": 1e39,
            "wind": -1e39,
            "size": 1e300,
            "opacity": -1e300,
        }));
        assert_eq!(c.speed, SPEED_RANGE.1);
        assert_eq!(c.wind, WIND_RANGE.0);
        assert_eq!(c.size, SIZE_RANGE.1);
        assert_eq!(c.opacity, OPACITY_RANGE.0);
    }

    #[test]
    fn non_finite_numbers_fall_back_to_defaults() {
        let c = Configuration {
            speed: f32::NAN,
            opacity: f32::INFINITY,
            ..Configuration::default()
        }
        .sanitized();
        assert_eq!(c.speed, DEFAULT_SPEED);
        assert_eq!(c.opacity, 1.0);
    }

    #[test]
    fn serializes_with_camel_case_and_snake_case_kind() {
        let c = Configuration {
            kind: ParticleKind::RainGlass,
            custom_text: Some("🍁".to_string()),
            ..Configuration::default()
        };
        let v: Value = serde_json::to_value(&c).unwrap();
        assert_eq!(v["type"], "rain_glass");
        assert_eq!(v["customText"], "🍁");
        assert!(v.get("customImage").is_none());
        assert_eq!(Configuration::from_json_value(&v), c);
    }

    #[test]
    fn glyph_and_image_path_fallbacks() {
        let mut c = Configuration::default();
        assert_eq!(c.glyph(), '❄');
        assert_eq!(c.image_path(), None);

        c.custom_text = Some("  ".to_string());
        assert_eq!(c.glyph(), '❄');
        c.custom_text = Some("🌸 petals".to_string());
        assert_eq!(c.glyph(), '🌸');

        c.custom_image = Some("file:///tmp/leaf.png".to_string());
        assert_eq!(c.image_path(), Some("/tmp/leaf.png"));
    }

    #[test]
    fn load_reads_file_and_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        std::fs::write(&good, r#"{"type":"rain","wind":-2}"#).unwrap();
        let c = Configuration::load(&good).unwrap();
        assert_eq!(c.kind, ParticleKind::Rain);
        assert_eq!(c.wind, -2.0);

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ nope").unwrap();
        assert!(matches!(
            Configuration::load(&bad),
            Err(Error::ConfigParse { .. })
        ));
        assert!(matches!(
            Configuration::load(&dir.path().join("missing.json")),
            Err(Error::ConfigRead { .. })
        ));
    }

    #[test]
    fn kind_cycles_through_every_variant() {
        let mut k = ParticleKind::Snow;
        for _ in 0..ParticleKind::ALL.len() {
            k = k.next();
        }
        assert_eq!(k, ParticleKind::Snow);
        assert_eq!("rain-glass".parse::<ParticleKind>(), Ok(ParticleKind::RainGlass));
    }
}
