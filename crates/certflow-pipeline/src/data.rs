use crate::config::{BrandingConfig, MergePrecedence};
use certflow_notify::DeliveryMetadata;
use certflow_types::{Event, Recipient};
use serde_json::{Map, Value};

/// 活动层字段
///
/// `event`/`eventName`、`date`/`eventDate`、`organization` 三组键，日期按品牌配置格式化，
/// 组织缺省为默认组织。
pub fn event_layer(event: &Event, branding: &BrandingConfig) -> Map<String, Value> {
    let mut layer = Map::new();
    let name = Value::String(event.metadata.name.clone());
    let date = Value::String(format_date(event, branding));

    layer.insert("event".to_string(), name.clone());
    layer.insert("eventName".to_string(), name);
    layer.insert("date".to_string(), date.clone());
    layer.insert("eventDate".to_string(), date);
    layer.insert(
        "organization".to_string(),
        Value::String(organization(event, branding)),
    );
    layer
}

/// 参与者层字段：name、email 与自定义数据
pub fn participant_layer(recipient: &Recipient) -> Map<String, Value> {
    let mut layer = recipient.custom_data.clone();
    layer.insert("name".to_string(), Value::String(recipient.name.clone()));
    layer.insert("email".to_string(), Value::String(recipient.email.clone()));
    layer
}

/// 合并两层字段，优先级高的一层覆盖同名键
pub fn render_data(
    event: &Event,
    recipient: &Recipient,
    branding: &BrandingConfig,
    precedence: MergePrecedence,
) -> Map<String, Value> {
    let (mut base, overlay) = match precedence {
        MergePrecedence::Participant => (event_layer(event, branding), participant_layer(recipient)),
        MergePrecedence::Event => (participant_layer(recipient), event_layer(event, branding)),
    };

    base.extend(overlay);
    base
}

/// 邮件使用的活动信息
pub fn delivery_metadata(event: &Event, branding: &BrandingConfig) -> DeliveryMetadata {
    DeliveryMetadata {
        event_name: event.metadata.name.clone(),
        organization_name: organization(event, branding),
        event_date: format_date(event, branding),
    }
}

fn organization(event: &Event, branding: &BrandingConfig) -> String {
    event
        .metadata
        .organization
        .clone()
        .filter(|org| !org.trim().is_empty())
        .unwrap_or_else(|| branding.default_organization.clone())
}

fn format_date(event: &Event, branding: &BrandingConfig) -> String {
    event
        .metadata
        .date
        .map(|date| date.format(&branding.date_format).to_string())
        .unwrap_or_default()
}
