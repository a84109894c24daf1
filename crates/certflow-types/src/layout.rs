//! 证书字段布局
//!
//! 坐标与字号都是相对模板尺寸的比例值：`x`/`y` 相对宽高，`fontSize` 相对宽度。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 单个布局最多允许的字段数
pub const MAX_FIELDS: usize = 50;

/// 布局错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LayoutError {
    #[error("Malformed field layout: {0}")]
    Malformed(String),

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },
}

impl LayoutError {
    fn field(field: impl ToString, message: impl Into<String>) -> Self {
        LayoutError::InvalidField {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// 水平对齐
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    pub fn as_str(&self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
        }
    }
}

/// 字段描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub id: String,
    /// 取值键（参与者数据或活动信息）
    pub key: String,
    /// 无数据时的占位文本
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub align: Align,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// 垂直偏移（像素）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v_offset: Option<f64>,
}

impl FieldDescriptor {
    pub fn new(id: impl Into<String>, key: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            label: None,
            x,
            y,
            font_size: 0.04,
            color: None,
            align: Align::Left,
            font_weight: None,
            font_family: None,
            v_offset: None,
        }
    }

    pub fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// 校验单个字段
    pub fn validate(&self, index: usize) -> Result<(), LayoutError> {
        if !(0.0..=1.0).contains(&self.x) {
            return Err(LayoutError::field(
                index,
                format!("x coordinate must be between 0 and 1, got {}", self.x),
            ));
        }
        if !(0.0..=1.0).contains(&self.y) {
            return Err(LayoutError::field(
                index,
                format!("y coordinate must be between 0 and 1, got {}", self.y),
            ));
        }
        if !(0.001..=0.2).contains(&self.font_size) {
            return Err(LayoutError::field(
                index,
                format!("fontSize must be between 0.001 and 0.2, got {}", self.font_size),
            ));
        }

        if let Some(color) = &self.color {
            if !is_hex_color(color) {
                return Err(LayoutError::field(
                    index,
                    format!("color must be valid hex format (#RRGGBB), got {}", color),
                ));
            }
        }

        if self.key.is_empty() || self.key.len() > 100 {
            return Err(LayoutError::field(
                index,
                "key must be between 1 and 100 characters",
            ));
        }
        if !self
            .key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(LayoutError::field(
                index,
                "key must contain only alphanumeric characters, hyphens, and underscores",
            ));
        }

        if let Some(label) = &self.label {
            if label.chars().count() > 500 {
                return Err(LayoutError::field(
                    index,
                    format!("label must be at most 500 characters, got {}", label.chars().count()),
                ));
            }
        }

        // 字体名会直接进入 CSS
        if let Some(family) = &self.font_family {
            if family.contains(['{', '}', ';', '<', '>']) {
                return Err(LayoutError::field(index, "fontFamily contains illegal characters"));
            }
        }
        if let Some(weight) = &self.font_weight {
            if !weight.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(LayoutError::field(index, "fontWeight must be alphanumeric"));
            }
        }

        Ok(())
    }
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// 校验整个布局
pub fn validate(fields: &[FieldDescriptor]) -> Result<(), LayoutError> {
    if fields.is_empty() {
        return Err(LayoutError::field("fields", "At least one field is required"));
    }
    if fields.len() > MAX_FIELDS {
        return Err(LayoutError::field(
            "fields",
            format!("Maximum {} fields allowed, got {}", MAX_FIELDS, fields.len()),
        ));
    }

    for (index, field) in fields.iter().enumerate() {
        field.validate(index)?;
    }

    Ok(())
}

/// 解析并校验 JSON 布局
pub fn parse(json: &str) -> Result<Vec<FieldDescriptor>, LayoutError> {
    let fields: Vec<FieldDescriptor> =
        serde_json::from_str(json).map_err(|e| LayoutError::Malformed(e.to_string()))?;
    validate(&fields)?;
    Ok(fields)
}

/// 序列化布局
pub fn to_json(fields: &[FieldDescriptor]) -> String {
    // Vec<FieldDescriptor> 序列化不会失败
    serde_json::to_string(fields).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_field() -> FieldDescriptor {
        FieldDescriptor::new("f1", "name", 0.5, 0.4).with_align(Align::Center)
    }

    #[test]
    fn test_parse_valid_layout() {
        let json = r##"[{"id":"f1","key":"name","x":0.5,"y":0.4,"fontSize":0.04,"color":"#1A2B3C","align":"center"}]"##;
        let fields = parse(json).unwrap();

        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].align, Align::Center);
        assert_eq!(fields[0].color.as_deref(), Some("#1A2B3C"));
    }

    #[test]
    fn test_parse_malformed_json() {
        let err = parse("{not json").unwrap_err();
        assert!(matches!(err, LayoutError::Malformed(_)));
    }

    #[test]
    fn test_reject_out_of_range_coordinates() {
        let mut field = name_field();
        field.x = 1.5;

        let err = validate(&[field]).unwrap_err();
        assert!(err.to_string().contains("x coordinate"));
    }

    #[test]
    fn test_reject_bad_color_and_key() {
        let mut field = name_field();
        field.color = Some("red; background: url(x)".to_string());
        assert!(validate(&[field]).is_err());

        let mut field = name_field();
        field.key = "name'; DROP".to_string();
        assert!(validate(&[field]).is_err());
    }

    #[test]
    fn test_reject_empty_and_oversized_layouts() {
        assert!(validate(&[]).is_err());

        let fields: Vec<_> = (0..=MAX_FIELDS)
            .map(|i| FieldDescriptor::new(format!("f{}", i), "name", 0.1, 0.1))
            .collect();
        assert!(validate(&fields).is_err());
    }

    #[test]
    fn test_to_json_round_trips_through_parse() {
        let json = to_json(&[name_field()]);
        assert_eq!(parse(&json).unwrap(), vec![name_field()]);
    }
}
