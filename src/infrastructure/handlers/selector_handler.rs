//! CSS-selector page scraper
//!
//! Opens the page named by the element's URL field, optionally waits for a
//! marker selector, and returns an object built from key/value list items
//! and named field rules. The runner shallow-merges that object into the
//! element.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};
use url::Url;

use crate::application::handler::{ItemContext, ItemHandler};
use crate::infrastructure::http_client::HttpClient;

#[derive(Debug, Clone, Deserialize)]
pub struct SelectorScript {
    /// Member of the element holding the page URL (ignored for string elements)
    #[serde(default = "default_url_field")]
    pub url_field: String,

    /// Selector that must match before anything is extracted
    #[serde(default)]
    pub wait_for: Option<String>,

    /// Turns `Key: Value` list items into members
    #[serde(default)]
    pub key_values: Option<KeyValueRule>,

    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyValueRule {
    pub selector: String,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_true")]
    pub lowercase_keys: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldRule {
    pub name: String,
    pub selector: String,
    #[serde(default)]
    pub extract: Extract,
    /// Fail the item instead of storing `null` when nothing matches
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extract {
    #[default]
    Text,
    AllText,
    Html,
    Link,
    Attr(String),
}

fn default_url_field() -> String {
    "url".to_string()
}

fn default_separator() -> String {
    ": ".to_string()
}

fn default_true() -> bool {
    true
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("invalid CSS selector '{selector}': {e}"))
}

impl SelectorScript {
    pub fn validate(&self) -> Result<(), String> {
        if self.fields.is_empty() && self.key_values.is_none() {
            return Err("selector script needs 'fields' or 'key_values'".to_string());
        }
        if let Some(kv) = &self.key_values {
            if kv.separator.is_empty() {
                return Err("key_values.separator must not be empty".to_string());
            }
        }
        let selectors = self
            .wait_for
            .iter()
            .chain(self.key_values.iter().map(|kv| &kv.selector))
            .chain(self.fields.iter().map(|f| &f.selector));
        for selector in selectors {
            compile(selector).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

struct CompiledField {
    name: String,
    selector: Selector,
    extract: Extract,
    required: bool,
}

struct CompiledKeyValues {
    selector: Selector,
    separator: String,
    lowercase_keys: bool,
}

pub struct SelectorHandler {
    name: String,
    url_field: String,
    wait_for: Option<(String, Selector)>,
    key_values: Option<CompiledKeyValues>,
    fields: Vec<CompiledField>,
    client: HttpClient,
}

impl SelectorHandler {
    pub fn new(name: impl Into<String>, script: SelectorScript, client: HttpClient) -> Result<Self> {
        let wait_for = script
            .wait_for
            .map(|raw| compile(&raw).map(|selector| (raw, selector)))
            .transpose()?;
        let key_values = script
            .key_values
            .map(|kv| {
                compile(&kv.selector).map(|selector| CompiledKeyValues {
                    selector,
                    separator: kv.separator,
                    lowercase_keys: kv.lowercase_keys,
                })
            })
            .transpose()?;
        let fields = script
            .fields
            .into_iter()
            .map(|field| {
                Ok(CompiledField {
                    selector: compile(&field.selector)?,
                    name: field.name,
                    extract: field.extract,
                    required: field.required,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: name.into(),
            url_field: script.url_field,
            wait_for,
            key_values,
            fields,
            client,
        })
    }

    fn page_url(&self, element: &Value) -> Result<Url> {
        let raw = match element {
            Value::String(raw) => raw.as_str(),
            Value::Object(map) => map
                .get(&self.url_field)
                .and_then(Value::as_str)
                .with_context(|| format!("element has no string '{}' member", self.url_field))?,
            other => bail!("cannot take a URL from {other}"),
        };
        Url::parse(raw).with_context(|| format!("invalid page URL '{raw}'"))
    }

    /// Extract the result object from a fetched page body.
    pub(crate) fn extract(&self, body: &str, page_url: &Url) -> Result<Value> {
        let html = Html::parse_document(body);

        if let Some((raw, selector)) = &self.wait_for {
            if html.select(selector).next().is_none() {
                bail!("'{raw}' not found on {page_url}");
            }
        }

        let mut out = Map::new();
        if let Some(kv) = &self.key_values {
            for node in html.select(&kv.selector) {
                let text = inner_text(node);
                if let Some((key, value)) = text.split_once(kv.separator.as_str()) {
                    let key = key.trim();
                    let key = if kv.lowercase_keys { key.to_lowercase() } else { key.to_string() };
                    out.insert(key, Value::String(value.trim().to_string()));
                }
            }
        }

        for field in &self.fields {
            let value = extract_field(&html, field, page_url);
            if field.required && is_missing(&value) {
                bail!("required field '{}' ('{:?}') matched nothing on {}", field.name, field.extract, page_url);
            }
            out.insert(field.name.clone(), value);
        }

        Ok(Value::Object(out))
    }
}

fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Visible text with whitespace runs collapsed.
fn inner_text(node: ElementRef<'_>) -> String {
    node.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_field(html: &Html, field: &CompiledField, page_url: &Url) -> Value {
    let mut matches = html.select(&field.selector);
    match &field.extract {
        Extract::AllText => Value::Array(
            matches
                .map(|node| Value::String(inner_text(node)))
                .collect(),
        ),
        Extract::Text => matches
            .next()
            .map_or(Value::Null, |node| Value::String(inner_text(node))),
        Extract::Html => matches
            .next()
            .map_or(Value::Null, |node| Value::String(node.inner_html())),
        Extract::Attr(attr) => matches
            .next()
            .and_then(|node| node.value().attr(attr))
            .map_or(Value::Null, |v| Value::String(v.to_string())),
        Extract::Link => matches.next().map_or(Value::Null, |node| {
            let href = node
                .value()
                .attr("href")
                .and_then(|href| page_url.join(href).ok())
                .map_or(Value::Null, |url| Value::String(url.to_string()));
            json!({ "name": inner_text(node), "url": href })
        }),
    }
}

#[async_trait]
impl ItemHandler for SelectorHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &ItemContext<'_>, element: &Value) -> Result<Value> {
        let url = self.page_url(element)?;
        info!("Opening page {} for item {}/{}", url, ctx.index + 1, ctx.total);
        let page = self.client.get_page(&url).await?;

        debug!("Parsing page data from {}", page.url);
        self.extract(&page.body, &page.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::HttpClientConfig;

    const PRODUCT_PAGE: &str = r#"
        <html><body>
          <h1> Blue  Kettle </h1>
          <ul>
            <li>Color: Blue</li>
            <li>Capacity: 1.7 L</li>
            <li>Seller: <a href="/sellers/42">Kitchen Co</a></li>
          </ul>
          <span class="tag">steel</span><span class="tag">electric</span>
        </body></html>
    "#;

    fn handler(script: &str) -> SelectorHandler {
        let script: SelectorScript = serde_json::from_str(script).unwrap();
        script.validate().unwrap();
        SelectorHandler::new(
            "product",
            script,
            HttpClient::new(HttpClientConfig::default()).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn extracts_key_values_and_fields() {
        let handler = handler(
            r#"{
                "wait_for": "li",
                "key_values": {"selector": "li"},
                "fields": [
                    {"name": "seller", "selector": "li a", "extract": "link"},
                    {"name": "title", "selector": "h1"},
                    {"name": "tags", "selector": ".tag", "extract": "all_text"},
                    {"name": "seller_href", "selector": "li a", "extract": {"attr": "href"}},
                    {"name": "missing", "selector": ".nope"}
                ]
            }"#,
        );
        let url = Url::parse("https://shop.example/products/7").unwrap();

        let result = handler.extract(PRODUCT_PAGE, &url).unwrap();

        assert_eq!(
            result,
            json!({
                "color": "Blue",
                "capacity": "1.7 L",
                "seller": {"name": "Kitchen Co", "url": "https://shop.example/sellers/42"},
                "title": "Blue Kettle",
                "tags": ["steel", "electric"],
                "seller_href": "/sellers/42",
                "missing": null
            })
        );
    }

    #[test]
    fn wait_for_and_required_fields_fail_the_item() {
        let url = Url::parse("https://shop.example/p").unwrap();

        let waiting = handler(r#"{"wait_for": "table", "fields": [{"name": "t", "selector": "h1"}]}"#);
        assert!(waiting.extract(PRODUCT_PAGE, &url).is_err());

        let required =
            handler(r#"{"fields": [{"name": "price", "selector": ".price", "required": true}]}"#);
        assert!(required.extract(PRODUCT_PAGE, &url).is_err());
    }

    #[test]
    fn page_url_comes_from_member_or_string_element() {
        let handler = handler(r#"{"url_field": "link", "fields": [{"name": "t", "selector": "h1"}]}"#);

        assert_eq!(
            handler.page_url(&json!({"link": "https://a.example/x"})).unwrap().as_str(),
            "https://a.example/x"
        );
        assert_eq!(
            handler.page_url(&json!("https://b.example/")).unwrap().as_str(),
            "https://b.example/"
        );
        assert!(handler.page_url(&json!({"url": "https://a.example"})).is_err());
        assert!(handler.page_url(&json!({"link": "not a url"})).is_err());
        assert!(handler.page_url(&json!(3)).is_err());
    }

    #[test]
    fn script_validation() {
        let empty: SelectorScript = serde_json::from_str("{}").unwrap();
        assert!(empty.validate().is_err());

        let bad_sep: SelectorScript =
            serde_json::from_str(r#"{"key_values": {"selector": "li", "separator": ""}}"#).unwrap();
        assert!(bad_sep.validate().is_err());
    }
}
