// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the ledger, storage and platform crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

/// Identifier prefix carried by orders keyed in by hand before platform sync.
pub const MANUAL_ORDER_PREFIX: &str = "manual-";

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Platform,
}

/// Lowercase, trim and drop empty status strings.
///
/// Platform and local rows spell statuses with varying case and use both
/// `null` and `""` for "no status".
pub fn normalize_status(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
}

// --- Orders ---

/// Where an order row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSource {
    /// Ingested from the commerce platform (webhook or sync).
    Platform,
    /// Keyed in by hand in the back office.
    Manual,
}

impl OrderSource {
    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSource::Platform => "platform",
            OrderSource::Manual => "manual",
        }
    }

    /// Parse from SQLite string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "platform" => Some(OrderSource::Platform),
            "manual" => Some(OrderSource::Manual),
            _ => None,
        }
    }
}

/// One commerce transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Stable identifier shared with the commerce platform.
    pub order_id: String,
    /// Human-facing name, e.g. `#1114`. May repeat across sources.
    pub order_name: String,
    /// Numeric part of the name when the platform provides one.
    pub order_number: Option<i64>,
    pub financial_status: Option<String>,
    pub fulfillment_status: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// `None` until the order has been reconciled against the platform.
    pub archived: Option<bool>,
    pub source: OrderSource,
    pub customer_id: Option<String>,
    pub customer_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns true for rows entered by hand rather than synced.
    pub fn is_manual(&self) -> bool {
        self.source == OrderSource::Manual || self.order_id.starts_with(MANUAL_ORDER_PREFIX)
    }

    /// Normalized financial status.
    pub fn financial(&self) -> Option<String> {
        normalize_status(self.financial_status.as_deref())
    }

    /// Normalized fulfillment status.
    pub fn fulfillment(&self) -> Option<String> {
        normalize_status(self.fulfillment_status.as_deref())
    }
}

// --- Line items ---

/// Whether a line item is still part of its order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineItemStatus {
    Active,
    Removed,
}

impl LineItemStatus {
    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineItemStatus::Active => "active",
            LineItemStatus::Removed => "removed",
        }
    }

    /// Parse from SQLite string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(LineItemStatus::Active),
            "removed" => Some(LineItemStatus::Removed),
            _ => None,
        }
    }
}

/// Refund state of a single line item. A missing value means "never refunded".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    None,
    Refunded,
}

impl RefundStatus {
    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::None => "none",
            RefundStatus::Refunded => "refunded",
        }
    }

    /// Parse from SQLite string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(RefundStatus::None),
            "refunded" => Some(RefundStatus::Refunded),
            _ => None,
        }
    }
}

/// A single purchased unit, the candidate for an edition number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub line_item_id: String,
    pub order_id: String,
    /// Accessory items without a product never receive an edition number.
    pub product_id: Option<String>,
    pub title: Option<String>,
    pub edition_number: Option<u32>,
    pub edition_total: Option<u32>,
    pub status: LineItemStatus,
    pub restocked: bool,
    pub refund_status: Option<RefundStatus>,
    pub owner_id: Option<String>,
    pub owner_email: Option<String>,
    pub owner_name: Option<String>,
    pub certificate_access_token: Option<String>,
    pub nfc_tag_id: Option<String>,
    /// Set at most once, when the collector claims the tag.
    pub nfc_claimed_at: Option<DateTime<Utc>>,
    /// Purchase time; edition numbers follow this order.
    pub created_at: DateTime<Utc>,
}

impl LineItem {
    /// Returns true if `owner` matches the owner id or (case-insensitively) the owner email.
    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.owner_id.as_deref() == Some(owner)
            || self
                .owner_email
                .as_deref()
                .is_some_and(|email| email.eq_ignore_ascii_case(owner))
    }
}

/// A line item joined with the order it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub item: LineItem,
    pub order: Order,
}

/// Product record owned by the catalog; the ledger only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub title: Option<String>,
    /// Fallback for `edition_total` on line items that lack one.
    pub edition_size: Option<u32>,
}

/// Requested change to the validity-affecting flags of a line item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagChange {
    pub status: Option<LineItemStatus>,
    pub restocked: Option<bool>,
    pub refund_status: Option<RefundStatus>,
}

impl FlagChange {
    /// Returns true if nothing would be written.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.restocked.is_none() && self.refund_status.is_none()
    }
}

/// Status fields to overwrite on an order. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderCorrection {
    pub financial_status: Option<String>,
    pub fulfillment_status: Option<String>,
    /// `Some(None)` clears the cancellation timestamp.
    pub cancelled_at: Option<Option<DateTime<Utc>>>,
    pub archived: Option<bool>,
}

impl OrderCorrection {
    /// Returns true if nothing would be written.
    pub fn is_empty(&self) -> bool {
        self.financial_status.is_none()
            && self.fulfillment_status.is_none()
            && self.cancelled_at.is_none()
            && self.archived.is_none()
    }

    /// Returns a copy of `order` with this correction applied.
    pub fn applied_to(&self, order: &Order) -> Order {
        let mut out = order.clone();
        if let Some(financial) = &self.financial_status {
            out.financial_status = Some(financial.clone());
        }
        if let Some(fulfillment) = &self.fulfillment_status {
            out.fulfillment_status = Some(fulfillment.clone());
        }
        if let Some(cancelled_at) = self.cancelled_at {
            out.cancelled_at = cancelled_at;
        }
        if let Some(archived) = self.archived {
            out.archived = Some(archived);
        }
        out
    }

    /// Names of the fields this correction would change on `order`.
    pub fn changed_fields(&self, order: &Order) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if let Some(financial) = &self.financial_status
            && normalize_status(Some(financial)) != order.financial()
        {
            fields.push("financial_status");
        }
        if let Some(fulfillment) = &self.fulfillment_status
            && normalize_status(Some(fulfillment)) != order.fulfillment()
        {
            fields.push("fulfillment_status");
        }
        if let Some(cancelled_at) = self.cancelled_at
            && cancelled_at != order.cancelled_at
        {
            fields.push("cancelled_at");
        }
        if let Some(archived) = self.archived
            && Some(archived) != order.archived
        {
            fields.push("archived");
        }
        fields
    }
}

/// New numbering for one line item inside a [`NumberingPlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberChange {
    pub line_item_id: String,
    pub edition_number: Option<u32>,
    pub edition_total: Option<u32>,
}

/// Every write a single resequence produces.
///
/// Stores apply the changes and append the events in one transaction.
#[derive(Debug, Clone, Default)]
pub struct NumberingPlan {
    pub product_id: String,
    pub changes: Vec<NumberChange>,
    pub events: Vec<EditionEvent>,
}

impl NumberingPlan {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.events.is_empty()
    }
}

// --- Audit ---

/// Kind of edition-affecting transition recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditionEventType {
    /// First edition number given to a line item.
    Assigned,
    /// An existing edition number changed.
    Resequenced,
    /// Validity changed or the number was cleared.
    StatusChanged,
    /// A duplicate, gap or stray number was detected.
    IntegrityViolation,
}

impl EditionEventType {
    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            EditionEventType::Assigned => "assigned",
            EditionEventType::Resequenced => "resequenced",
            EditionEventType::StatusChanged => "status_changed",
            EditionEventType::IntegrityViolation => "integrity_violation",
        }
    }

    /// Parse from SQLite string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "assigned" => Some(EditionEventType::Assigned),
            "resequenced" => Some(EditionEventType::Resequenced),
            "status_changed" => Some(EditionEventType::StatusChanged),
            "integrity_violation" => Some(EditionEventType::IntegrityViolation),
            _ => None,
        }
    }
}

/// Append-only audit row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditionEvent {
    /// Row id, assigned by the store on insert.
    pub id: Option<i64>,
    pub line_item_id: String,
    pub product_id: Option<String>,
    /// Edition number at the time of the event.
    pub edition_number: Option<u32>,
    pub event_type: EditionEventType,
    pub event_data: serde_json::Value,
    pub owner_id: Option<String>,
    pub owner_email: Option<String>,
    pub owner_name: Option<String>,
    pub status: LineItemStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl EditionEvent {
    /// Build an event snapshotting the owner and status of `item`.
    pub fn for_item(
        item: &LineItem,
        event_type: EditionEventType,
        edition_number: Option<u32>,
        event_data: serde_json::Value,
        created_by: &str,
    ) -> Self {
        Self {
            id: None,
            line_item_id: item.line_item_id.clone(),
            product_id: item.product_id.clone(),
            edition_number,
            event_type,
            event_data,
            owner_id: item.owner_id.clone(),
            owner_email: item.owner_email.clone(),
            owner_name: item.owner_name.clone(),
            status: item.status,
            created_at: Utc::now(),
            created_by: created_by.to_string(),
        }
    }
}

// --- Reconciliation ---

/// Severity of a reconciliation finding, ordered from least to most urgent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Mismatch,
    Critical,
}

/// One field that differs between the local store and the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub order_id: String,
    pub order_number: String,
    pub field: String,
    pub local: Option<String>,
    pub platform: Option<String>,
    pub severity: Severity,
}

/// The platform's view of an order, limited to the fields the ledger reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformOrder {
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub order_number: Option<i64>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub fulfillment_status: Option<String>,
    #[serde(default)]
    pub cancelled_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
    /// Order status as reported by platforms that expose one (`open`, `closed`).
    #[serde(default)]
    pub status: Option<String>,
    /// Comma-separated tag list.
    #[serde(default)]
    pub tags: String,
}

impl PlatformOrder {
    pub fn financial(&self) -> Option<String> {
        normalize_status(self.financial_status.as_deref())
    }

    pub fn fulfillment(&self) -> Option<String> {
        normalize_status(self.fulfillment_status.as_deref())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled_at.is_some()
    }

    /// Archived means tagged `archived` or closed on the platform side.
    pub fn is_archived(&self) -> bool {
        let tagged = self
            .tags
            .split(',')
            .any(|tag| tag.trim().eq_ignore_ascii_case("archived"));
        let closed = normalize_status(self.status.as_deref()).as_deref() == Some("closed")
            || self.closed_at.is_some();
        tagged || closed
    }

    /// Parsed cancellation timestamp, if present and well-formed.
    pub fn cancelled_at_utc(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        let now = Utc::now();
        Order {
            order_id: "1001".into(),
            order_name: "#1114".into(),
            order_number: Some(1114),
            financial_status: Some("Paid".into()),
            fulfillment_status: None,
            cancelled_at: None,
            archived: None,
            source: OrderSource::Platform,
            customer_id: None,
            customer_email: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn normalize_status_lowercases_and_drops_blank() {
        assert_eq!(normalize_status(Some(" PAID ")), Some("paid".into()));
        assert_eq!(normalize_status(Some("")), None);
        assert_eq!(normalize_status(None), None);
    }

    #[test]
    fn manual_orders_detected_by_source_or_prefix() {
        let mut o = order();
        assert!(!o.is_manual());
        o.order_id = "manual-7".into();
        assert!(o.is_manual());
        o.order_id = "1001".into();
        o.source = OrderSource::Manual;
        assert!(o.is_manual());
    }

    #[test]
    fn platform_order_parses_numeric_id_and_defaults() {
        let json = r##"{"id": 450789469, "name": "#1114", "financial_status": "paid"}"##;
        let parsed: PlatformOrder = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.id, "450789469");
        assert_eq!(parsed.tags, "");
        assert!(!parsed.is_cancelled());
        assert!(!parsed.is_archived());
    }

    #[test]
    fn platform_order_archived_by_tag_or_closed() {
        let json = r##"{"id": "1", "name": "#1", "tags": "vip, Archived"}"##;
        let tagged: PlatformOrder = serde_json::from_str(json).unwrap();
        assert!(tagged.is_archived());

        let json = r##"{"id": "2", "name": "#2", "status": "closed"}"##;
        let closed: PlatformOrder = serde_json::from_str(json).unwrap();
        assert!(closed.is_archived());

        let json = r##"{"id": "3", "name": "#3", "tags": "archived-later"}"##;
        let neither: PlatformOrder = serde_json::from_str(json).unwrap();
        assert!(!neither.is_archived());
    }

    #[test]
    fn correction_reports_only_real_changes() {
        let o = order();
        let correction = OrderCorrection {
            financial_status: Some("paid".into()),
            fulfillment_status: Some("fulfilled".into()),
            cancelled_at: Some(None),
            archived: Some(true),
        };
        assert_eq!(
            correction.changed_fields(&o),
            vec!["fulfillment_status", "archived"]
        );
        let applied = correction.applied_to(&o);
        assert_eq!(applied.fulfillment_status.as_deref(), Some("fulfilled"));
        assert_eq!(applied.archived, Some(true));
    }

    #[test]
    fn storage_enums_round_trip() {
        for s in ["active", "removed"] {
            assert_eq!(LineItemStatus::parse(s).unwrap().as_str(), s);
        }
        for s in ["assigned", "resequenced", "status_changed", "integrity_violation"] {
            assert_eq!(EditionEventType::parse(s).unwrap().as_str(), s);
        }
        assert!(OrderSource::parse("csv").is_none());
    }

    #[test]
    fn severity_orders_by_urgency() {
        assert!(Severity::Critical > Severity::Mismatch);
        assert!(Severity::Mismatch > Severity::Info);
        assert_eq!(Severity::Critical.to_string(), "critical");
    }
}
