use chrono::NaiveDate;
use httpmock::{Method::GET, MockServer};
use insider_pulse::{
    data::{
        fmp::FmpClient,
        normalize::ShareFields,
        universe::UniverseClient,
        yahoo::YahooClient,
        InsiderSource, MarketSource, UniverseSource,
    },
    error::ProviderError,
};
use serde_json::json;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn fmp(server: &MockServer) -> FmpClient {
    FmpClient::new(server.base_url(), "test-key", ShareFields::default()).unwrap()
}

#[tokio::test]
async fn fmp_insider_search_keeps_sales_in_range() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/insider-trading/search")
            .query_param("symbol", "AAPL")
            .query_param("apikey", "test-key");
        then.status(200).json_body(json!([
            {
                "symbol": "AAPL",
                "transactionDate": "2024-02-10",
                "transactionType": "S-Sale",
                "securitiesTransacted": 1200,
                "price": 180.5,
                "reportingName": "Cook Timothy D",
                "typeOfOwner": "officer: CEO"
            },
            {
                "symbol": "AAPL",
                "transactionDate": "2024-02-11",
                "transactionType": "P-Purchase",
                "acquisitionOrDisposition": "A",
                "securitiesTransacted": 50
            },
            {
                "symbol": "AAPL",
                "transactionDate": "2023-01-01",
                "transactionType": "S-Sale",
                "securitiesTransacted": 10
            }
        ]));
    });

    let records = fmp(&server)
        .insider_sells(Some("AAPL"), day(2024, 1, 1), day(2024, 3, 31))
        .await
        .unwrap();
    mock.assert();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.ticker, "AAPL");
    assert_eq!(r.shares_sold, 1200.0);
    assert_eq!(r.value_usd, Some(180.5 * 1200.0));
    assert_eq!(r.insider_name.as_deref(), Some("Cook Timothy D"));
    assert_eq!(r.role.as_deref(), Some("officer: CEO"));
}

#[tokio::test]
async fn fmp_limit_message_is_rate_limited() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/quote");
        then.status(200)
            .json_body(json!({"Error Message": "Limit Reach . Please upgrade your plan"}));
    });
    let err = fmp(&server)
        .quotes(&["AAPL".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited { .. }));
}

#[tokio::test]
async fn fmp_429_is_rate_limited() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/news/stock");
        then.status(429);
    });
    let err = fmp(&server).news("AAPL", 2).await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited { .. }));
}

#[tokio::test]
async fn fmp_without_key_is_not_configured() {
    let client = FmpClient::new("http://127.0.0.1:9", "", ShareFields::default()).unwrap();
    assert!(!InsiderSource::is_configured(&client));
    let err = client.quotes(&["AAPL".to_string()]).await.unwrap_err();
    assert!(matches!(err, ProviderError::NotConfigured { .. }));
}

#[tokio::test]
async fn fmp_quotes_and_history_parse() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/quote").query_param("symbol", "AAPL,MSFT");
        then.status(200).json_body(json!([
            {"symbol": "AAPL", "price": 190.1, "changePercentage": -1.2},
            {"symbol": "MSFT", "price": 410.0, "changesPercentage": 0.4}
        ]));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/historical-price-eod/full")
            .query_param("symbol", "AAPL")
            .query_param("from", "2024-01-01");
        then.status(200).json_body(json!({
            "symbol": "AAPL",
            "historical": [
                {"date": "2024-01-03", "close": 184.2},
                {"date": "2024-01-02", "close": 185.6}
            ]
        }));
    });

    let client = fmp(&server);
    let quotes = client
        .quotes(&["AAPL".to_string(), "MSFT".to_string()])
        .await
        .unwrap();
    assert_eq!(quotes.len(), 2);
    assert_eq!(quotes[0].change_pct, -1.2);
    assert_eq!(quotes[1].change_pct, 0.4);

    let history = client
        .history("AAPL", day(2024, 1, 1), day(2024, 1, 31))
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].date, day(2024, 1, 2));
}

#[tokio::test]
async fn yahoo_quotes_convert_share_class_symbols() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v7/finance/quote")
            .query_param("symbols", "BRK-B");
        then.status(200).json_body(json!({
            "quoteResponse": {"result": [
                {"symbol": "BRK-B", "regularMarketPrice": 110.0, "previousClose": 100.0}
            ]}
        }));
    });
    let quotes = YahooClient::new(server.base_url())
        .unwrap()
        .quotes(&["BRK.B".to_string()])
        .await
        .unwrap();
    mock.assert();
    assert_eq!(quotes[0].symbol, "BRK.B");
    assert!((quotes[0].change_pct - 10.0).abs() < 1e-9);
}

#[tokio::test]
async fn yahoo_chart_skips_missing_closes() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/v8/finance/chart/AAPL")
            .query_param("interval", "1d");
        then.status(200).json_body(json!({
            "chart": {"result": [{
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {"quote": [{"close": [185.6, null, 181.9]}]}
            }]}
        }));
    });
    let history = YahooClient::new(server.base_url())
        .unwrap()
        .history("AAPL", day(2024, 1, 1), day(2024, 1, 31))
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].date, day(2024, 1, 2));
    assert_eq!(history[1].close, 181.9);
}

#[tokio::test]
async fn yahoo_news_truncates_titles() {
    let server = MockServer::start();
    let long_title = "x".repeat(120);
    server.mock(|when, then| {
        when.method(GET).path("/v1/finance/search").query_param("q", "AAPL");
        then.status(200).json_body(json!({
            "news": [
                {"title": long_title.as_str(), "link": "https://example.com/1"},
                {"title": "second", "link": "https://example.com/2"},
                {"title": "third", "link": "https://example.com/3"}
            ]
        }));
    });
    let news = YahooClient::new(server.base_url())
        .unwrap()
        .news("AAPL", 2)
        .await
        .unwrap();
    assert_eq!(news.len(), 2);
    assert_eq!(news[0].title.chars().count(), 80);
}

#[tokio::test]
async fn universe_csv_is_fetched_and_parsed() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/constituents.csv");
        then.status(200).body(
            "Symbol,Security,GICS Sector\nAAPL,Apple Inc.,Information Technology\nBRK.B,Berkshire Hathaway,Financials\n",
        );
    });
    let companies = UniverseClient::new(server.url("/constituents.csv"))
        .unwrap()
        .companies()
        .await
        .unwrap();
    assert_eq!(companies.len(), 2);
    assert_eq!(companies[1].symbol, "BRK.B");
    assert_eq!(companies[1].sector, "Financials");
}
