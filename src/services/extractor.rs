use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::models::UNKNOWN_PRODUCT;

/// Pulls a price and a product name out of a product page.
pub trait PriceExtractor: Send + Sync {
    /// `None` when the page carries no readable price. Never panics.
    fn extract(&self, document: &str) -> Option<f64>;

    /// Falls back to [`UNKNOWN_PRODUCT`].
    fn extract_product_name(&self, document: &str) -> String;
}

// first number, allowing thousands separators and a fractional part
static NUMBER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").ok());

/// Parses a displayed price such as `₹1,23,999` or `Rs. 12,499.50`.
pub fn parse_price(text: &str) -> Option<f64> {
    let re = NUMBER.as_ref()?;
    let raw = re.find(text)?.as_str().replace(',', "");
    raw.parse::<f64>().ok().filter(|p| p.is_finite())
}

/// Reads `span[itemprop="price"]` and the first `h1`.
pub struct ItempropExtractor {
    price: Option<Selector>,
    title: Option<Selector>,
}

impl Default for ItempropExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ItempropExtractor {
    pub fn new() -> Self {
        Self {
            price: Selector::parse(r#"span[itemprop="price"]"#).ok(),
            title: Selector::parse("h1").ok(),
        }
    }
}

impl PriceExtractor for ItempropExtractor {
    fn extract(&self, document: &str) -> Option<f64> {
        let selector = self.price.as_ref()?;
        let doc = Html::parse_document(document);
        let el = doc.select(selector).next()?;

        // microdata pages sometimes keep the machine value in `content`
        let text = el
            .value()
            .attr("content")
            .map(str::to_string)
            .unwrap_or_else(|| el.text().collect::<String>());

        parse_price(&text)
    }

    fn extract_product_name(&self, document: &str) -> String {
        let Some(selector) = self.title.as_ref() else {
            return UNKNOWN_PRODUCT.to_string();
        };

        let doc = Html::parse_document(document);
        doc.select(selector)
            .next()
            .map(|n| n.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string())
    }
}
