use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One license grant as returned by the license API.
///
/// Every field is a nullable string. The server is not consistent about
/// types (counters may arrive as numbers, `customer_source` as an object),
/// so non-string values are kept as their JSON text.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LicenseRow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub customer_ref: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub customer_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub customer_source: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_username: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_fullname: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub product_ref: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub product_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub product_duration: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub product_price: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub license_details: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub license_start: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub license_end: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tracking_first_access: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tracking_last_access: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tracking_visits: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tracking_elapsed_time: Option<String>,
}

impl LicenseRow {
    /// Look up a field by its wire name.
    pub fn field(&self, key: &str) -> Option<&str> {
        let value = match key {
            "customer_ref" => &self.customer_ref,
            "customer_name" => &self.customer_name,
            "customer_source" => &self.customer_source,
            "user_username" => &self.user_username,
            "user_fullname" => &self.user_fullname,
            "product_ref" => &self.product_ref,
            "product_title" => &self.product_title,
            "product_duration" => &self.product_duration,
            "product_price" => &self.product_price,
            "license_details" => &self.license_details,
            "license_start" => &self.license_start,
            "license_end" => &self.license_end,
            "tracking_first_access" => &self.tracking_first_access,
            "tracking_last_access" => &self.tracking_last_access,
            "tracking_visits" => &self.tracking_visits,
            "tracking_elapsed_time" => &self.tracking_elapsed_time,
            _ => return None,
        };
        value.as_deref()
    }
}

/// Summary of a server-side ingestion run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub fetched: u64,
    pub upserted: u64,
    pub from_date: String,
    pub to_date: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Customer {
    pub customer_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Product {
    pub product_title: String,
}

/// Filters driving a license search or export.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LicenseFilters {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub customer_name: Option<String>,
    pub product_title: Option<String>,
    pub page: Option<u32>,
}

/// Body of `POST /api/license-details`. Unset filters are left out.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LicenseQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_title: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub export: bool,
}

impl LicenseQuery {
    /// A paginated search; page defaults to 1.
    pub fn search(filters: &LicenseFilters) -> Self {
        Self {
            page: Some(filters.page.unwrap_or(1)),
            export: false,
            ..Self::unpaginated(filters)
        }
    }

    /// The full match set for a spreadsheet export.
    pub fn export(filters: &LicenseFilters) -> Self {
        Self {
            export: true,
            ..Self::unpaginated(filters)
        }
    }

    fn unpaginated(filters: &LicenseFilters) -> Self {
        Self {
            date_from: non_empty(&filters.date_from),
            date_to: non_empty(&filters.date_to),
            page: None,
            customer_name: non_empty(&filters.customer_name),
            product_title: non_empty(&filters.product_title),
            export: false,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[derive(Serialize, Debug)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// The `{ok, error?}` part of the wrapper every server response uses. It is
/// read on its own so a failure message survives a payload of the wrong
/// shape; the payload is parsed from the same object afterwards.
#[derive(Deserialize, Debug)]
pub struct EnvelopeHeader {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct LoginPayload {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct LicensePayload {
    #[serde(default)]
    pub license: Option<Vec<LicenseRow>>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct IngestPayload {
    #[serde(default)]
    pub report: Option<IngestReport>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CustomersPayload {
    #[serde(default)]
    pub customers: Option<Vec<Customer>>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ProductsPayload {
    #[serde(default)]
    pub products: Option<Vec<Product>>,
}

/// A page of search results.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LicensePage {
    pub rows: Vec<LicenseRow>,
    pub total: u64,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
