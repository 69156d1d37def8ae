//! Financial news acquisition with fallback to canned headlines.
//!
//! Mirrors the market-data chain at a smaller scale: NewsAPI when
//! keyed, Alpha Vantage's NEWS_SENTIMENT endpoint as backup, canned
//! articles when neither is configured or both fail. Articles are
//! cached for five minutes and filtered per request, so switching
//! category or search text never re-hits the upstream.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::ResponseCache;
use crate::config::{ProviderConfig, ServiceConfig};
use crate::errors::MarketDataError;
use crate::transport::ProxyClient;

const NEWS_CACHE_TTL: Duration = Duration::from_secs(300);
const NEWS_CACHE_KEY: &str = "articles";
const DEFAULT_PAGE_SIZE: u32 = 20;

/// News categories shown by the dashboard, each with the keywords used
/// for upstream queries and for local filtering.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsCategory {
    All,
    Markets,
    Crypto,
    Commodities,
    Forex,
}

impl NewsCategory {
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::All => &["business", "finance", "markets", "economy"],
            Self::Markets => &["stock market", "wall street", "nasdaq", "dow jones", "s&p 500"],
            Self::Crypto => &["bitcoin", "ethereum", "cryptocurrency", "blockchain"],
            Self::Commodities => &["gold", "oil", "silver", "commodities"],
            Self::Forex => &["forex", "currency", "dollar", "euro"],
        }
    }

    /// Classify an article by scanning its text for category keywords.
    /// Unmatched content lands in `Markets`.
    pub fn detect(content: &str) -> Self {
        let content = content.to_lowercase();
        for category in [Self::Markets, Self::Crypto, Self::Commodities, Self::Forex] {
            if category.keywords().iter().any(|k| content.contains(k)) {
                return category;
            }
        }
        Self::Markets
    }
}

/// One news article in the common internal shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Article {
    /// Stable id derived from the article URL
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub source: String,
    pub author: String,
    pub published_at: DateTime<Utc>,
    pub image: Option<String>,
    pub category: NewsCategory,
    /// Only Alpha Vantage reports sentiment
    pub sentiment: Option<String>,
}

/// News fetcher with a five-minute article cache.
pub struct NewsService {
    client: ProxyClient,
    newsapi: ProviderConfig,
    alpha_vantage: ProviderConfig,
    use_mock_data: bool,
    cache: ResponseCache,
}

impl NewsService {
    pub fn new(config: &ServiceConfig) -> Result<Self, MarketDataError> {
        Ok(Self {
            client: ProxyClient::new(config.request_timeout)?,
            newsapi: config.newsapi.clone(),
            alpha_vantage: config.alpha_vantage.clone(),
            use_mock_data: config.use_mock_data,
            cache: ResponseCache::new(NEWS_CACHE_TTL),
        })
    }

    /// Fetch, cache, and filter articles. Never fails outward: upstream
    /// failures degrade to the stale cache, then to canned headlines.
    pub async fn fetch_news(&self, category: NewsCategory, query: Option<&str>) -> Vec<Article> {
        if let Some(articles) = self.cached_articles().await {
            debug!("returning cached news articles");
            return filter_articles(articles, category, query);
        }

        let fetched = self.fetch_fresh(category).await;
        let articles = match fetched {
            Ok(articles) => {
                if let Ok(value) = serde_json::to_value(&articles) {
                    self.cache.set(NEWS_CACHE_KEY, value).await;
                }
                articles
            }
            Err(e) => {
                warn!("news fetch failed: {}, degrading", e);
                match self.stale_articles().await {
                    Some(stale) => stale,
                    None => mock_news(),
                }
            }
        };

        filter_articles(articles, category, query)
    }

    async fn fetch_fresh(&self, category: NewsCategory) -> Result<Vec<Article>, MarketDataError> {
        if self.use_mock_data {
            return Ok(mock_news());
        }
        if self.newsapi.is_usable(true) {
            return self.fetch_from_newsapi(category).await;
        }
        if self.alpha_vantage.is_usable(true) {
            return self.fetch_from_alpha_vantage(category).await;
        }
        debug!("no news sources configured, using canned headlines");
        Ok(mock_news())
    }

    async fn fetch_from_newsapi(&self, category: NewsCategory) -> Result<Vec<Article>, MarketDataError> {
        let query = category.keywords().join(" OR ");
        let url = format!(
            "{}/everything?q={}&language=en&sortBy=publishedAt&pageSize={}&apiKey={}",
            self.newsapi.base_url,
            urlencoding::encode(&query),
            DEFAULT_PAGE_SIZE,
            self.newsapi.api_key.as_deref().unwrap_or_default()
        );
        let body = self.client.get_json(&url).await?;
        normalize_newsapi(body)
    }

    async fn fetch_from_alpha_vantage(&self, category: NewsCategory) -> Result<Vec<Article>, MarketDataError> {
        let topics = match category {
            NewsCategory::All => "financial_markets",
            NewsCategory::Markets => "markets",
            NewsCategory::Crypto => "crypto",
            NewsCategory::Commodities => "commodities",
            NewsCategory::Forex => "forex",
        };
        let url = format!(
            "{}?function=NEWS_SENTIMENT&topics={}&sort=LATEST&limit={}&apikey={}",
            self.alpha_vantage.base_url,
            topics,
            DEFAULT_PAGE_SIZE,
            self.alpha_vantage.api_key.as_deref().unwrap_or_default()
        );
        let body = self.client.get_json(&url).await?;
        normalize_alpha_vantage(body)
    }

    async fn cached_articles(&self) -> Option<Vec<Article>> {
        let value = self.cache.get(NEWS_CACHE_KEY).await?;
        serde_json::from_value(value).ok()
    }

    async fn stale_articles(&self) -> Option<Vec<Article>> {
        let value = self.cache.get_stale(NEWS_CACHE_KEY).await?;
        serde_json::from_value(value).ok()
    }
}

/// Stable article id: first half of the URL's md5 digest.
fn article_id(url: &str) -> String {
    format!("{:x}", md5::compute(url))[..16].to_string()
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    articles: Option<Vec<NewsApiArticle>>,
}

#[derive(Debug, Deserialize)]
struct NewsApiArticle {
    title: String,
    description: Option<String>,
    url: String,
    source: Option<NewsApiSource>,
    author: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    #[serde(rename = "urlToImage")]
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}

fn normalize_newsapi(body: Value) -> Result<Vec<Article>, MarketDataError> {
    let response: NewsApiResponse =
        serde_json::from_value(body).map_err(|e| MarketDataError::Schema {
            provider: "NEWSAPI".to_string(),
            message: format!("unexpected everything shape: {}", e),
        })?;

    Ok(response
        .articles
        .unwrap_or_default()
        .into_iter()
        .map(|article| {
            let description = article
                .description
                .unwrap_or_else(|| "No description available".to_string());
            let published_at = article
                .published_at
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);
            Article {
                id: article_id(&article.url),
                category: NewsCategory::detect(&format!("{} {}", article.title, description)),
                title: article.title,
                description,
                url: article.url,
                source: article
                    .source
                    .and_then(|s| s.name)
                    .unwrap_or_else(|| "Unknown".to_string()),
                author: article.author.unwrap_or_else(|| "Unknown".to_string()),
                published_at,
                image: article.image,
                sentiment: None,
            }
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct AlphaVantageNewsResponse {
    feed: Option<Vec<AlphaVantageArticle>>,
}

#[derive(Debug, Deserialize)]
struct AlphaVantageArticle {
    title: String,
    summary: Option<String>,
    url: String,
    source: Option<String>,
    authors: Option<Vec<String>>,
    time_published: Option<String>,
    banner_image: Option<String>,
    overall_sentiment_label: Option<String>,
}

fn normalize_alpha_vantage(body: Value) -> Result<Vec<Article>, MarketDataError> {
    let response: AlphaVantageNewsResponse =
        serde_json::from_value(body).map_err(|e| MarketDataError::Schema {
            provider: "ALPHA_VANTAGE".to_string(),
            message: format!("unexpected NEWS_SENTIMENT shape: {}", e),
        })?;

    Ok(response
        .feed
        .unwrap_or_default()
        .into_iter()
        .map(|article| {
            let description = article
                .summary
                .unwrap_or_else(|| "No description available".to_string());
            // "20240115T123000" in the exchange's local convention
            let published_at = article
                .time_published
                .as_deref()
                .and_then(|raw| NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%S").ok())
                .map(|naive| Utc.from_utc_datetime(&naive))
                .unwrap_or_else(Utc::now);
            Article {
                id: article_id(&article.url),
                category: NewsCategory::detect(&format!("{} {}", article.title, description)),
                title: article.title,
                description,
                url: article.url,
                source: article.source.unwrap_or_else(|| "Unknown".to_string()),
                author: article
                    .authors
                    .filter(|a| !a.is_empty())
                    .map(|a| a.join(", "))
                    .unwrap_or_else(|| "Unknown".to_string()),
                published_at,
                image: article.banner_image,
                sentiment: article.overall_sentiment_label,
            }
        })
        .collect())
}

/// Filter by category (tag match, or keyword hit in title/description)
/// and then by free-text search over title, description, and source.
pub fn filter_articles(
    articles: Vec<Article>,
    category: NewsCategory,
    query: Option<&str>,
) -> Vec<Article> {
    let mut filtered: Vec<Article> = articles
        .into_iter()
        .filter(|article| {
            if category == NewsCategory::All {
                return true;
            }
            if article.category == category {
                return true;
            }
            let text = format!("{} {}", article.title, article.description).to_lowercase();
            category.keywords().iter().any(|k| text.contains(k))
        })
        .collect();

    if let Some(query) = query.map(str::to_lowercase).filter(|q| !q.is_empty()) {
        filtered.retain(|article| {
            article.title.to_lowercase().contains(&query)
                || article.description.to_lowercase().contains(&query)
                || article.source.to_lowercase().contains(&query)
        });
    }
    filtered
}

/// Most frequent long words across articles, capitalized, best first.
pub fn trending_topics(articles: &[Article], limit: usize) -> Vec<String> {
    const STOP_WORDS: [&str; 13] = [
        "the", "is", "at", "which", "on", "a", "an", "as", "to", "in", "for", "of", "and",
    ];

    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for article in articles {
        let text = format!("{} {}", article.title, article.description).to_lowercase();
        for token in text.split(|c: char| !c.is_alphanumeric()) {
            if token.len() >= 4 && !STOP_WORDS.contains(&token) {
                *counts.entry(token.to_string()).or_insert(0) += 1;
            }
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(word, _)| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => word,
            }
        })
        .collect()
}

/// Canned headlines served when no news source is configured.
pub fn mock_news() -> Vec<Article> {
    let now = Utc::now();
    let canned = [
        (
            "S&P 500 Reaches New Record High Amid Strong Earnings",
            "The S&P 500 index closed at a record high today, driven by better-than-expected quarterly earnings from tech giants and positive economic indicators.",
            "Financial Times",
            "Market Desk",
            30i64,
            NewsCategory::Markets,
        ),
        (
            "Federal Reserve Signals Potential Rate Cuts in 2024",
            "Fed Chairman indicates the central bank may consider interest rate reductions if inflation continues its downward trend, boosting market sentiment.",
            "Reuters",
            "Economic Team",
            120,
            NewsCategory::Markets,
        ),
        (
            "Bitcoin Surges Past $70,000 on ETF Approval Hopes",
            "Bitcoin prices rallied to $70,000 as investors anticipate approval of spot Bitcoin ETFs, marking a significant milestone for cryptocurrency adoption.",
            "CoinDesk",
            "Crypto Analysts",
            180,
            NewsCategory::Crypto,
        ),
        (
            "Gold Prices Climb as Dollar Weakens",
            "Gold futures rose 1.8% today as the US dollar weakened against major currencies, making the precious metal more attractive to international buyers.",
            "Bloomberg",
            "Commodities Team",
            240,
            NewsCategory::Commodities,
        ),
        (
            "Crude Oil Prices Stabilize After OPEC+ Production Cuts",
            "Oil prices found support around $90 per barrel following OPEC+ announcement of extended production cuts through Q2 2024.",
            "CNBC",
            "Energy Desk",
            300,
            NewsCategory::Commodities,
        ),
        (
            "EUR/USD Reaches 6-Month High on ECB Policy Divergence",
            "The euro strengthened against the dollar, reaching its highest level in six months as the European Central Bank maintains a hawkish stance.",
            "Forex.com",
            "FX Team",
            360,
            NewsCategory::Forex,
        ),
        (
            "Ethereum Network Upgrade Improves Transaction Speed",
            "The latest Ethereum protocol upgrade successfully reduced gas fees and improved transaction throughput, strengthening its position in DeFi.",
            "Decrypt",
            "Blockchain Team",
            480,
            NewsCategory::Crypto,
        ),
        (
            "Silver Prices Jump on Industrial Demand Forecast",
            "Silver futures gained 2.3% after industry reports forecasted increased demand from solar panel and electric vehicle manufacturers.",
            "Kitco News",
            "Metals Desk",
            720,
            NewsCategory::Commodities,
        ),
    ];

    canned
        .into_iter()
        .enumerate()
        .map(|(index, (title, description, source, author, minutes_ago, category))| Article {
            id: format!("mock-{}", index + 1),
            title: title.to_string(),
            description: description.to_string(),
            url: "#".to_string(),
            source: source.to_string(),
            author: author.to_string(),
            published_at: now - chrono::Duration::minutes(minutes_ago),
            image: None,
            category,
            sentiment: None,
        })
        .collect()
}
