use std::str::FromStr;
use std::sync::LazyLock;

use bourse_models::{
    dataset, CommodityQuote, Fetched, GlobalCommodities, IndexQuote, MarketOverview, PriceQuote,
};
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::client::BourseClient;
use crate::error::ApiError;
use crate::executor::ApiRequest;
use crate::fetch::cached_fetch;

const ENDPOINT: &str = "market-overview/";

/// Price-list section holding the exchange-traded gold funds.
const FUNDS_SECTION: &str = "طلا در بورس";

const GOLD: &[(&str, &str)] = &[
    ("geram18", "طلای 18 عیار / 750"),
    ("geram24", "طلای ۲۴ عیار"),
];

const COINS: &[(&str, &str)] = &[
    ("sekeb", "بهار آزادی"),
    ("nim", "نیم"),
    ("rob", "ربع"),
    ("gerami", "گرمی"),
];

const FUNDS: &[(&str, &str)] = &[
    ("gc3", "صندوق طلای مفید (عیار)"),
    ("gc1", "صندوق طلای لوتوس (طلا)"),
    ("gc35", "صندوق طلای زرین آگاه (مثقال)"),
    ("gc55", "صندوق طلای جواهر"),
];

const INDICES: &[(&str, &str)] = &[
    ("Total_Index", "شاخص کل"),
    ("Equal_Weighted_Index", "شاخص کل (هم وزن)"),
    ("Price_Equal_Weighted_Index", "شاخص قیمت (هم وزن)"),
    ("Industry_Index", "شاخص صنعت"),
];

/// Backend prices are in rial; everything shown is in toman.
const RIAL_PER_TOMAN: Decimal = Decimal::TEN;

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)").expect("leading number pattern is valid")
});

static CHANGE_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^%]+)%\)").expect("change percent pattern is valid"));

impl BourseClient {
    /// Landing-page snapshot. `fresh_token` authenticates this one request,
    /// e.g. right after login before the session has been persisted.
    pub async fn fetch_market_overview(
        &self,
        force_refresh: bool,
        fresh_token: Option<&str>,
    ) -> Fetched<MarketOverview> {
        let today = self.now().date_naive();
        cached_fetch(self.cache(), dataset::MARKET_OVERVIEW, force_refresh, || async move {
            let mut request = ApiRequest::get(ENDPOINT);
            if let Some(token) = fresh_token {
                request = request.with_token(token);
            }
            let raw = self.api().get_json(request).await?;
            reshape_market_overview(&raw, today)
        })
        .await
    }
}

/// Regroup the backend's price lists into the overview buckets.
///
/// Fails when none of the three source sections is present.
pub fn reshape_market_overview(raw: &Value, today: NaiveDate) -> Result<MarketOverview, ApiError> {
    let sections = ["tgju_data", "iran_market_indices", "global_commodities"];
    if !sections.iter().any(|section| raw.get(section).is_some()) {
        return Err(ApiError::Shape(
            "market overview is missing every price section".to_string(),
        ));
    }

    let tgju = raw.get("tgju_data").unwrap_or(&Value::Null);
    let indices_raw = raw.get("iran_market_indices").unwrap_or(&Value::Null);
    let commodities_raw = raw.get("global_commodities").unwrap_or(&Value::Null);

    let gold_sections = array(tgju.get("gold_prices"));
    let book: Vec<&Value> = gold_sections
        .iter()
        .flat_map(|section| array(section.get("prices")))
        .chain(array(tgju.get("currency_prices")))
        .chain(array(tgju.get("coin_prices")))
        .collect();

    let gold = pick_in_order(&book, GOLD);
    let coin = pick_in_order(&book, COINS);

    let funds = gold_sections
        .iter()
        .find(|section| str_field(section, "title") == Some(FUNDS_SECTION))
        .map(|section| {
            array(section.get("prices"))
                .iter()
                .filter_map(fund_quote)
                .collect()
        })
        .unwrap_or_default();

    let indices = INDICES
        .iter()
        .map(|(key, title)| {
            let src = indices_raw.get(*key).unwrap_or(&Value::Null);
            IndexQuote {
                key: key.to_string(),
                title: title.to_string(),
                value: field_or_null(src, "value"),
                change: field_or_null(src, "change"),
                percent: field_or_null(src, "percent"),
                date: field_or_null(src, "date"),
            }
        })
        .collect();

    let commodity = |name: &str, title: &str| {
        Some(CommodityQuote {
            title: title.to_string(),
            value: field_or_null(commodities_raw, name),
        })
    };
    let global_commodities = GlobalCommodities {
        gold: commodity("gold", "طلای جهانی (اونس)"),
        silver: commodity("silver", "نقره جهانی (اونس)"),
        platinum: commodity("platinum", "پلاتین جهانی (اونس)"),
        copper: commodity("copper", "مس جهانی (اونس)"),
    };

    let last_backend_update = display_date(raw.get("date"))
        .or_else(|| display_date(indices_raw.get("Total_Index").and_then(|i| i.get("date"))))
        .unwrap_or_else(|| today.format("%Y-%m-%d").to_string());

    Ok(MarketOverview {
        gold,
        coin,
        funds,
        indices,
        global_commodities,
        last_backend_update: Some(last_backend_update),
    })
}

/// One quote per wanted entry, skipping the ones not listed today.
fn pick_in_order(book: &[&Value], wanted: &[(&str, &str)]) -> Vec<PriceQuote> {
    wanted
        .iter()
        .filter_map(|(key, title)| find_item(book, key, title))
        .map(|item| with_unit(price_quote(item)))
        .collect()
}

/// Stable key first, then a substring match on the display title.
fn find_item<'a>(book: &[&'a Value], key: &str, title: &str) -> Option<&'a Value> {
    book.iter()
        .find(|item| str_field(item, "key") == Some(key))
        .or_else(|| {
            book.iter()
                .find(|item| str_field(item, "title").is_some_and(|t| t.contains(title)))
        })
        .copied()
}

fn fund_quote(item: &Value) -> Option<PriceQuote> {
    let key = str_field(item, "key");
    let known = key.and_then(|key| FUNDS.iter().find(|(k, _)| *k == key));
    let display = match known {
        Some((_, name)) => Some(name.to_string()),
        None => {
            let title = str_field(item, "title")?;
            let matches = FUNDS.iter().any(|(_, name)| {
                name.split(' ').all(|part| title.contains(part))
            });
            if !matches {
                return None;
            }
            Some(title.to_string())
        }
    };
    let mut quote = price_quote(item);
    quote.title = display;
    Some(with_unit(quote))
}

fn with_unit(mut quote: PriceQuote) -> PriceQuote {
    quote.title = quote.title.map(|title| format!("{title} (IRT)"));
    quote
}

fn price_quote(item: &Value) -> PriceQuote {
    PriceQuote {
        title: str_field(item, "title").map(str::to_string),
        price: to_toman(item.get("price")),
        change_percent: change_percent(item.get("change_percent")),
        change_value: to_toman(item.get("change_value")),
        last_update: to_toman(item.get("last_update")),
        key: str_field(item, "key").map(str::to_string),
    }
}

/// `"1,234,560"` rial → `123456` toman. Reads the leading number only.
pub fn to_toman(value: Option<&Value>) -> Option<Decimal> {
    let rial = match value? {
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| *c != ',' && !c.is_whitespace())
                .collect();
            let number = LEADING_NUMBER.find(&cleaned)?;
            Decimal::from_str(number.as_str().trim_end_matches('.')).ok()?
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => Decimal::from(i),
            None => Decimal::from_f64(n.as_f64()?)?,
        },
        _ => return None,
    };
    Some(rial / RIAL_PER_TOMAN)
}

/// Percentage from `"(0.53%) 9,200"`, or `None` when there is no
/// parenthesised percent.
pub fn change_percent(value: Option<&Value>) -> Option<f64> {
    let text = value?.as_str()?;
    let inner = CHANGE_PERCENT.captures(text)?.get(1)?.as_str().trim();
    let number = LEADING_NUMBER.find(inner)?;
    number.as_str().parse().ok()
}

fn display_date(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn array(value: Option<&Value>) -> &[Value] {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn str_field<'a>(value: &'a Value, name: &str) -> Option<&'a str> {
    value.get(name).and_then(Value::as_str)
}

fn field_or_null(value: &Value, name: &str) -> Value {
    value.get(name).cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn sample() -> Value {
        json!({
            "tgju_data": {
                "gold_prices": [
                    {
                        "title": "طلا",
                        "prices": [
                            {"key": "geram18", "title": "طلای 18 عیار / 750", "price": "65,432,100", "change_percent": "(0.53%) 346,000", "change_value": "346,000"},
                            {"title": "طلای ۲۴ عیار", "price": "87,000,000", "change_percent": "0"}
                        ]
                    },
                    {
                        "title": "طلا در بورس",
                        "prices": [
                            {"key": "gc3", "title": "عیار مفید", "price": "250,000"},
                            {"key": "gc99", "title": "صندوق طلای جواهر نوین", "price": "120,000"},
                            {"key": "gc77", "title": "صندوق نقره", "price": "10,000"}
                        ]
                    }
                ],
                "coin_prices": [
                    {"key": "sekeb", "title": "سکه بهار آزادی", "price": "500,000,000"},
                    {"key": "rob", "title": "ربع سکه", "price": 150000000}
                ]
            },
            "iran_market_indices": {
                "Total_Index": {"value": "2,100,000", "change": "-5,000", "percent": "-0.24", "date": "1403/02/12"}
            },
            "global_commodities": {"gold": 2330.5, "silver": 27.1}
        })
    }

    #[test]
    fn groups_and_converts_prices() {
        let overview = reshape_market_overview(&sample(), today()).unwrap();

        assert_eq!(overview.gold.len(), 2);
        assert_eq!(overview.gold[0].title.as_deref(), Some("طلای 18 عیار / 750 (IRT)"));
        assert_eq!(overview.gold[0].price, Some(dec!(6543210)));
        assert_eq!(overview.gold[0].change_percent, Some(0.53));
        assert_eq!(overview.gold[0].change_value, Some(dec!(34600)));
        assert_eq!(overview.gold[1].key, None);
        assert_eq!(overview.gold[1].change_percent, None);

        let coin_titles: Vec<_> = overview.coin.iter().map(|c| c.title.clone()).collect();
        assert_eq!(
            coin_titles,
            vec![
                Some("سکه بهار آزادی (IRT)".to_string()),
                Some("ربع سکه (IRT)".to_string())
            ]
        );
        assert_eq!(overview.coin[1].price, Some(dec!(15000000)));
    }

    #[test]
    fn funds_match_by_key_or_name_parts() {
        let overview = reshape_market_overview(&sample(), today()).unwrap();
        let titles: Vec<_> = overview.funds.iter().filter_map(|f| f.title.clone()).collect();
        assert_eq!(
            titles,
            vec![
                "صندوق طلای مفید (عیار) (IRT)".to_string(),
                "صندوق طلای جواهر نوین (IRT)".to_string()
            ]
        );
    }

    #[test]
    fn indices_and_commodities_are_always_listed() {
        let overview = reshape_market_overview(&sample(), today()).unwrap();
        assert_eq!(overview.indices.len(), 4);
        assert_eq!(overview.indices[0].title, "شاخص کل");
        assert_eq!(overview.indices[0].value, json!("2,100,000"));
        assert_eq!(overview.indices[3].value, Value::Null);

        let commodities = &overview.global_commodities;
        assert_eq!(commodities.gold.as_ref().unwrap().value, json!(2330.5));
        assert_eq!(commodities.copper.as_ref().unwrap().value, Value::Null);
        assert_eq!(overview.last_backend_update.as_deref(), Some("1403/02/12"));
    }

    #[test]
    fn backend_date_preferred_then_today() {
        let mut raw = sample();
        raw["date"] = json!("1403/02/13");
        let overview = reshape_market_overview(&raw, today()).unwrap();
        assert_eq!(overview.last_backend_update.as_deref(), Some("1403/02/13"));

        let overview = reshape_market_overview(&json!({"global_commodities": {}}), today()).unwrap();
        assert_eq!(overview.last_backend_update.as_deref(), Some("2024-05-01"));
        assert!(overview.gold.is_empty());
    }

    #[test]
    fn empty_response_is_a_shape_error() {
        assert!(matches!(
            reshape_market_overview(&json!({}), today()),
            Err(ApiError::Shape(_))
        ));
    }

    #[test]
    fn patterns_compile() {
        assert!(LEADING_NUMBER.is_match("12.5"));
        assert!(CHANGE_PERCENT.is_match("(0.53%)"));
    }

    #[test]
    fn amount_parsing() {
        assert_eq!(to_toman(Some(&json!("1,234,560"))), Some(dec!(123456)));
        assert_eq!(to_toman(Some(&json!(" 99.5 "))), Some(dec!(9.95)));
        assert_eq!(to_toman(Some(&json!("12abc"))), Some(dec!(1.2)));
        assert_eq!(to_toman(Some(&json!("n/a"))), None);
        assert_eq!(to_toman(Some(&json!(null))), None);
        assert_eq!(to_toman(None), None);
    }

    #[test]
    fn percent_parsing() {
        assert_eq!(change_percent(Some(&json!("(-1.25%) 9,200"))), Some(-1.25));
        assert_eq!(change_percent(Some(&json!("0"))), None);
        assert_eq!(change_percent(Some(&json!(0.5))), None);
    }
}
