use crate::template::Template;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use certflow_types::{escape_html, Align, FieldDescriptor};
use serde_json::{Map, Value};
use std::fmt::Write;

/// 组合完整的证书页面
///
/// 模板图片以 data URL 内嵌，页面尺寸等于模板原始像素尺寸；
/// 每个字段按相对坐标绝对定位，字号相对模板宽度。
pub fn compose_page(
    template: &Template,
    fields: &[FieldDescriptor],
    data: &Map<String, Value>,
) -> String {
    let width = template.width() as f64;
    let height = template.height() as f64;
    let image_src = format!(
        "data:{};base64,{}",
        template.mime_type(),
        STANDARD.encode(&template.bytes)
    );

    let mut styles = String::new();
    let mut body = String::new();

    for (index, field) in fields.iter().enumerate() {
        let _ = write!(
            styles,
            "#field_{index} {{ position: absolute; left: {left}px; top: {top}px; \
             transform: translateX({shift}); margin-top: {offset}px; font-size: {size}px; \
             color: {color}; text-align: {align}; font-family: {family}; font-weight: {weight}; \
             line-height: 1; white-space: nowrap; z-index: 10; }}\n",
            index = index,
            left = field.x * width,
            top = field.y * height,
            shift = translate(field.align),
            offset = field.v_offset.unwrap_or(0.0),
            size = field.font_size * width,
            color = field.color.as_deref().unwrap_or("#000000"),
            align = field.align.as_str(),
            family = field.font_family.as_deref().unwrap_or("sans-serif"),
            weight = field.font_weight.as_deref().unwrap_or("normal"),
        );

        let _ = writeln!(
            body,
            "<div id=\"field_{}\">{}</div>",
            index,
            escape_html(&field_value(field, data))
        );
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n\
         body, html {{ margin: 0; padding: 0; width: {w}px; height: {h}px; overflow: hidden; }}\n\
         .container {{ position: relative; width: {w}px; height: {h}px; \
         background-image: url('{src}'); background-size: contain; background-repeat: no-repeat; }}\n\
         {styles}</style>\n</head>\n<body>\n<div class=\"container\">\n{body}</div>\n</body>\n</html>\n",
        w = template.width(),
        h = template.height(),
        src = image_src,
        styles = styles,
        body = body,
    )
}

/// 字段取值：数据中的同名键，否则为标签，否则为空
pub fn field_value(field: &FieldDescriptor, data: &Map<String, Value>) -> String {
    let value = match data.get(&field.key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    };

    value
        .or_else(|| field.label.clone())
        .unwrap_or_default()
}

fn translate(align: Align) -> &'static str {
    match align {
        Align::Left => "0",
        Align::Center => "-50%",
        Align::Right => "-100%",
    }
}
