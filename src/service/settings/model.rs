use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transport-assigned identifier of a user. For Telegram this is the private chat id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Unknown model: {0}")]
    UnknownModel(String),
    #[error("Unknown size: {0}")]
    UnknownSize(String),
    #[error("Size {size} is not supported by {model}")]
    UnsupportedSize { model: Model, size: Size },
    #[error("Quantity out of range: {0}")]
    QuantityOutOfRange(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Model {
    #[serde(rename = "dall-e-2")]
    Dalle2,
    #[serde(rename = "dall-e-3")]
    Dalle3,
}

impl Model {
    pub const ALL: [Model; 2] = [Model::Dalle2, Model::Dalle3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Dalle2 => "dall-e-2",
            Model::Dalle3 => "dall-e-3",
        }
    }

    /// Legal sizes in menu order. The first one is the default after a model switch.
    pub fn sizes(&self) -> &'static [Size; 3] {
        match self {
            Model::Dalle2 => &[Size::S256, Size::S512, Size::S1024],
            Model::Dalle3 => &[Size::S1024, Size::S1024x1792, Size::S1792x1024],
        }
    }

    pub fn default_size(&self) -> Size {
        self.sizes()[0]
    }

    pub fn supports(&self, size: Size) -> bool {
        self.sizes().contains(&size)
    }

    /// Images the API produces per request for this model.
    pub fn batch_limit(&self) -> u8 {
        match self {
            Model::Dalle2 => Quantity::MAX,
            Model::Dalle3 => 1,
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dall-e-2" => Ok(Model::Dalle2),
            "dall-e-3" => Ok(Model::Dalle3),
            _ => Err(SettingsError::UnknownModel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Size {
    #[serde(rename = "256x256")]
    S256,
    #[serde(rename = "512x512")]
    S512,
    #[serde(rename = "1024x1024")]
    S1024,
    #[serde(rename = "1024x1792")]
    S1024x1792,
    #[serde(rename = "1792x1024")]
    S1792x1024,
}

impl Size {
    pub fn as_str(&self) -> &'static str {
        match self {
            Size::S256 => "256x256",
            Size::S512 => "512x512",
            Size::S1024 => "1024x1024",
            Size::S1024x1792 => "1024x1792",
            Size::S1792x1024 => "1792x1024",
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Size {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "256x256" => Ok(Size::S256),
            "512x512" => Ok(Size::S512),
            "1024x1024" => Ok(Size::S1024),
            "1024x1792" => Ok(Size::S1024x1792),
            "1792x1024" => Ok(Size::S1792x1024),
            _ => Err(SettingsError::UnknownSize(s.to_string())),
        }
    }
}

/// Number of images per request, always within `MIN..=MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(u8);

impl Quantity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    pub fn new(value: i64) -> Result<Self, SettingsError> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(SettingsError::QuantityOutOfRange(value))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Quantity> {
        (Self::MIN..=Self::MAX).map(Quantity)
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = SettingsError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(quantity: Quantity) -> Self {
        quantity.0 as i64
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Quantity {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .parse::<i64>()
            .map_err(|_| SettingsError::QuantityOutOfRange(0))?;
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub model: Model,
    pub size: Size,
    pub quantity: Quantity,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: Model::Dalle2,
            size: Model::Dalle2.default_size(),
            quantity: Quantity::default(),
        }
    }
}

impl Settings {
    /// Returns the settings with `patch` applied.
    ///
    /// A model in the patch always resets the size to that model's default, even when the
    /// current size is legal for both models. A size in the patch is then checked against the
    /// resulting model.
    pub fn apply(&self, patch: &SettingsPatch) -> Result<Settings, SettingsError> {
        let mut next = *self;

        if let Some(model) = patch.model {
            next.model = model;
            next.size = model.default_size();
        }

        if let Some(size) = patch.size {
            if !next.model.supports(size) {
                return Err(SettingsError::UnsupportedSize {
                    model: next.model,
                    size,
                });
            }
            next.size = size;
        }

        if let Some(quantity) = patch.quantity {
            next.quantity = quantity;
        }

        Ok(next)
    }
}

/// Partial update of [`Settings`]; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub model: Option<Model>,
    pub size: Option<Size>,
    pub quantity: Option<Quantity>,
}

impl SettingsPatch {
    pub fn model(model: Model) -> Self {
        Self {
            model: Some(model),
            ..Default::default()
        }
    }

    pub fn size(size: Size) -> Self {
        Self {
            size: Some(size),
            ..Default::default()
        }
    }

    pub fn quantity(quantity: Quantity) -> Self {
        Self {
            quantity: Some(quantity),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub joined_at: DateTime<Utc>,
    pub settings: Settings,
}

impl User {
    pub fn new(id: UserId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            joined_at: Utc::now(),
            settings: Settings::default(),
        }
    }
}
