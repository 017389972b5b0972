use crate::core::{
    crawl, crawl_all, ConfigError, CrawlConfig, CrawlError, CrawlState, Crawler,
    NetworkErrorKind, PageError,
};
use crate::parser::ExtractorVariant;
use crate::scrapers::{MockResponse, MockScraper};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEMPLATE: &str = "https://www.imovirtual.com/comprar/apartamento/?page={page}";

fn offer(title: &str, href: &str) -> String {
    format!(
        r#"<article><a href="{}"><span class="offer-item-title">{}</span></a></article>"#,
        href, title
    )
}

/// A results page with `count` listings whose URLs are unique per page.
fn results_page(page: usize, count: usize) -> String {
    let offers: String = (1..=count)
        .map(|i| offer(&format!("Anuncio {}-{}", page, i), &format!("/anuncio/p{}-{}", page, i)))
        .collect();
    format!("<html><body>{}</body></html>", offers)
}

fn config() -> CrawlConfig {
    CrawlConfig::new(TEMPLATE, ExtractorVariant::Imovirtual)
        .with_name("test")
        .with_delay(Duration::ZERO)
}

fn crawler_for(scraper: &MockScraper) -> Crawler {
    Crawler::new(Box::new(scraper.clone()))
}

#[tokio::test]
async fn test_stops_on_empty_page() {
    let scraper = MockScraper::from_pages([results_page(1, 3), results_page(2, 4)]);
    let crawler = crawler_for(&scraper);

    let report = crawler.crawl(&config()).await.unwrap();

    assert_eq!(report.state, CrawlState::StoppedByEmptyPage { page_index: 3 });
    assert_eq!(report.listings.len(), 7);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(scraper.requested_pages(), vec![1, 2, 3]);
    assert!(report
        .listings
        .iter()
        .all(|l| l.source_page == 1 || l.source_page == 2));
}

#[tokio::test]
async fn test_never_requests_past_max_pages() {
    let scraper = MockScraper::from_pages((1..=5).map(|p| results_page(p, 2)));
    let crawler = crawler_for(&scraper);

    let report = crawler.crawl(&config().with_max_pages(3)).await.unwrap();

    assert_eq!(report.state, CrawlState::StoppedByMaxPages);
    assert_eq!(scraper.requested_pages(), vec![1, 2, 3]);
    assert_eq!(report.listings.len(), 6);
}

#[tokio::test]
async fn test_single_page_keeps_document_order() {
    let scraper = MockScraper::from_pages([results_page(1, 5), results_page(2, 5)]);
    let crawler = crawler_for(&scraper);

    let report = crawler.crawl(&config().with_max_pages(1)).await.unwrap();

    let titles: Vec<_> = report.listings.iter().map(|l| l.title.clone()).collect();
    assert_eq!(
        titles,
        (1..=5)
            .map(|i| format!("Anuncio 1-{}", i))
            .collect::<Vec<_>>()
    );
    assert_eq!(scraper.requested_pages(), vec![1]);
}

#[tokio::test]
async fn test_duplicates_across_pages_keep_first_title() {
    let page_one = format!(
        "<html><body>{}{}</body></html>",
        offer("Original", "/anuncio/shared"),
        offer("Only on one", "/anuncio/one")
    );
    let page_two = format!(
        "<html><body>{}{}{}</body></html>",
        offer("Repost", "/anuncio/shared"),
        offer("Only on two", "/anuncio/two"),
        offer("Repost again", "https://www.imovirtual.com/anuncio/shared")
    );
    let scraper = MockScraper::from_pages([page_one, page_two]);
    let crawler = crawler_for(&scraper);

    let report = crawler.crawl(&config()).await.unwrap();

    let urls: HashSet<_> = report.listings.iter().map(|l| l.url.clone()).collect();
    assert_eq!(urls.len(), report.listings.len());
    assert_eq!(report.listings.len(), 3);
    assert_eq!(report.duplicates_dropped, 2);

    let titles: Vec<_> = report.listings.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["Original", "Only on one", "Only on two"]);
    assert_eq!(report.stats.duplicates_dropped, 2);
}

#[tokio::test]
async fn test_returns_partial_listings_after_consecutive_failures() {
    let mut responses = HashMap::new();
    responses.insert(1, MockResponse::Html(results_page(1, 5)));
    responses.insert(2, MockResponse::Html(results_page(2, 5)));
    responses.insert(3, MockResponse::Status(503));
    responses.insert(4, MockResponse::Timeout);
    responses.insert(5, MockResponse::Html(results_page(5, 5)));
    let scraper = MockScraper::new(responses);
    let crawler = crawler_for(&scraper);

    let err = crawler
        .crawl(&config().with_max_consecutive_failures(2))
        .await
        .unwrap_err();

    match &err {
        CrawlError::Aborted {
            page_index,
            consecutive_failures,
            source,
            partial,
        } => {
            assert_eq!(*page_index, 4);
            assert_eq!(*consecutive_failures, 2);
            assert_eq!(source.page_index(), 4);
            assert!(matches!(
                source,
                PageError::Network(e) if matches!(e.kind, NetworkErrorKind::Timeout)
            ));
            assert_eq!(partial.listings.len(), 10);
            assert_eq!(partial.state, CrawlState::StoppedByError { page_index: 4 });
            assert_eq!(partial.skipped_pages, vec![3]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(scraper.requested_pages(), vec![1, 2, 3, 4]);
    assert_eq!(err.into_partial().unwrap().into_listings().len(), 10);
}

#[tokio::test]
async fn test_failure_below_threshold_skips_page() {
    let mut responses = HashMap::new();
    responses.insert(1, MockResponse::Html(results_page(1, 2)));
    responses.insert(2, MockResponse::ConnectionRefused);
    responses.insert(3, MockResponse::Html(results_page(3, 2)));
    responses.insert(4, MockResponse::Status(500));
    responses.insert(5, MockResponse::Html(results_page(5, 2)));
    let scraper = MockScraper::new(responses);
    let crawler = crawler_for(&scraper);

    let report = crawler
        .crawl(&config().with_max_consecutive_failures(2))
        .await
        .unwrap();

    // Successful pages reset the counter, so two isolated failures never abort.
    assert_eq!(report.state, CrawlState::StoppedByEmptyPage { page_index: 6 });
    assert_eq!(report.skipped_pages, vec![2, 4]);
    assert_eq!(report.listings.len(), 6);
    assert_eq!(report.stats.pages_failed, 2);
    assert_eq!(scraper.requested_pages(), vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn test_first_failure_aborts_with_default_threshold() {
    let mut responses = HashMap::new();
    responses.insert(1, MockResponse::Html(results_page(1, 3)));
    responses.insert(2, MockResponse::Status(429));
    let scraper = MockScraper::new(responses);
    let crawler = crawler_for(&scraper);

    let err = crawler.crawl(&config()).await.unwrap_err();

    let partial = err.partial().unwrap();
    assert_eq!(partial.listings.len(), 3);
    assert!(partial.skipped_pages.is_empty());
    assert_eq!(scraper.requested_pages(), vec![1, 2]);
}

#[tokio::test]
async fn test_parse_failure_counts_as_page_failure() {
    let mut responses = HashMap::new();
    responses.insert(1, MockResponse::Html(results_page(1, 2)));
    responses.insert(2, MockResponse::Html("Em manutenção".to_string()));
    let scraper = MockScraper::new(responses);
    let crawler = crawler_for(&scraper);

    let err = crawler.crawl(&config()).await.unwrap_err();

    match err {
        CrawlError::Aborted {
            source: PageError::Parse(e),
            partial,
            ..
        } => {
            assert_eq!(e.page_index(), 2);
            assert_eq!(partial.listings.len(), 2);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_failure_on_last_page_stops_by_max_pages() {
    let mut responses = HashMap::new();
    responses.insert(1, MockResponse::Html(results_page(1, 2)));
    responses.insert(2, MockResponse::Status(502));
    let scraper = MockScraper::new(responses);
    let crawler = crawler_for(&scraper);

    let report = crawler
        .crawl(
            &config()
                .with_max_pages(2)
                .with_max_consecutive_failures(3),
        )
        .await
        .unwrap();

    assert_eq!(report.state, CrawlState::StoppedByMaxPages);
    assert_eq!(report.skipped_pages, vec![2]);
    assert_eq!(report.listings.len(), 2);
}

#[tokio::test]
async fn test_start_page() {
    let scraper = MockScraper::from_pages((1..=4).map(|p| results_page(p, 1)));
    let crawler = crawler_for(&scraper);

    let report = crawler
        .crawl(&config().with_start_page(3).with_max_pages(5))
        .await
        .unwrap();

    assert_eq!(scraper.requested_pages(), vec![3, 4, 5]);
    assert_eq!(report.listings.len(), 2);
    assert_eq!(report.listings[0].source_page, 3);
}

#[tokio::test]
async fn test_skipped_nodes_are_reported() {
    let page = format!(
        "<html><body>{}<span class=\"offer-item-title\">No anchor</span>{}</body></html>",
        offer("A", "/a"),
        offer("B", "/b")
    );
    let scraper = MockScraper::from_pages([page]);
    let crawler = crawler_for(&scraper);

    let report = crawler.crawl(&config()).await.unwrap();

    assert_eq!(report.listings.len(), 2);
    assert_eq!(report.skipped_nodes.len(), 1);
    assert_eq!(report.skipped_nodes[0].page_index, 1);
    assert_eq!(report.stats.nodes_skipped, 1);
}

#[tokio::test]
async fn test_invalid_config_fetches_nothing() {
    let scraper = MockScraper::from_pages([results_page(1, 1)]);
    let crawler = crawler_for(&scraper);

    let result = crawler
        .crawl(&CrawlConfig::new("https://example.com/list", ExtractorVariant::Imovirtual))
        .await;

    assert!(matches!(result, Err(CrawlError::Config(_))));
    assert!(result.unwrap_err().partial().is_none());
    assert!(scraper.requested_pages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_delay_only_between_successful_pages() {
    let scraper = MockScraper::from_pages([results_page(1, 1), results_page(2, 1)]);
    let crawler = crawler_for(&scraper);
    let config = config().with_delay(Duration::from_secs(1));

    let start = tokio::time::Instant::now();
    crawler.crawl(&config).await.unwrap();

    // Pages 1 and 2 are followed by a pause, the empty page 3 is not.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(2), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_no_delay_after_terminal_page_or_failure() {
    let mut responses = HashMap::new();
    responses.insert(1, MockResponse::Status(500));
    responses.insert(2, MockResponse::Html(results_page(2, 1)));
    responses.insert(3, MockResponse::Html(results_page(3, 1)));
    let scraper = MockScraper::new(responses);
    let crawler = crawler_for(&scraper);
    let config = config()
        .with_delay(Duration::from_secs(1))
        .with_max_pages(3)
        .with_max_consecutive_failures(2);

    let start = tokio::time::Instant::now();
    let report = crawler.crawl(&config).await.unwrap();

    assert_eq!(report.state, CrawlState::StoppedByMaxPages);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(1), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_crawler_can_be_reused() {
    let scraper = MockScraper::from_pages([results_page(1, 2)]);
    let crawler = crawler_for(&scraper);

    let first = crawler.crawl(&config()).await.unwrap();
    let second = crawler.crawl(&config()).await.unwrap();

    assert_eq!(first.listings, second.listings);
    assert_eq!(second.stats.pages_requested, 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_sessions_on_one_crawler_keep_separate_stats() {
    let scraper = MockScraper::from_pages([results_page(1, 2)]);
    let crawler = crawler_for(&scraper);
    let slow = config().with_name("slow").with_delay(Duration::from_secs(1));
    let fast = config().with_name("fast");

    let (slow, fast) = tokio::join!(crawler.crawl(&slow), crawler.crawl(&fast));
    let (slow, fast) = (slow.unwrap(), fast.unwrap());

    for report in [&slow, &fast] {
        assert_eq!(report.pages_fetched, 2);
        assert_eq!(report.stats.pages_requested, 2);
        assert_eq!(report.stats.pages_succeeded, 2);
        assert_eq!(report.stats.listings_kept, 2);
        assert_eq!(report.listings.len(), 2);
    }
    assert_eq!(slow.name, "slow");
    assert_eq!(scraper.requested_pages().len(), 4);
}

fn listing_page(price: &str, address: &str) -> String {
    format!(
        r#"<html><body>
            <strong class="css-t3wmkv e1l1avn10">{} €</strong>
            <div class="css-z9gx1y e3ustps0">{}</div>
            <div class="css-o4i8bk e1qm3vsd1">Tipo:</div><div class="css-1ytkscc e1qm3vsd3">T2</div>
        </body></html>"#,
        price, address
    )
}

fn listing_url(page: usize, i: usize) -> Url {
    Url::parse(&format!("https://www.imovirtual.com/anuncio/p{}-{}", page, i)).unwrap()
}

#[tokio::test]
async fn test_enrich_details_from_listing_pages() {
    let mut listings = HashMap::new();
    listings.insert(
        listing_url(1, 1),
        MockResponse::Html(listing_page("250 000", "Rua A, Arroios, Lisboa")),
    );
    listings.insert(listing_url(1, 2), MockResponse::Status(410));
    listings.insert(
        listing_url(2, 1),
        MockResponse::Html(listing_page("99 000", "Bonfim, Porto")),
    );
    let scraper = MockScraper::from_pages([results_page(1, 2), results_page(2, 1)])
        .with_listing_pages(listings);
    let crawler = crawler_for(&scraper);

    let report = crawler
        .crawl(&config().with_enrich_details(true))
        .await
        .unwrap();

    assert_eq!(report.state, CrawlState::StoppedByEmptyPage { page_index: 3 });
    assert_eq!(
        scraper.requested_listings(),
        vec![listing_url(1, 1), listing_url(1, 2), listing_url(2, 1)]
    );

    let first = report.listings[0].details.as_ref().unwrap();
    assert_eq!(first.price.as_deref(), Some("250 000"));
    assert_eq!(first.city.as_deref(), Some("Arroios"));
    assert_eq!(first.state.as_deref(), Some("Lisboa"));
    assert_eq!(first.attributes["Tipo"], "T2");

    assert!(report.listings[1].details.is_none());
    assert_eq!(
        report.listings[2].details.as_ref().unwrap().state.as_deref(),
        Some("Porto")
    );

    assert_eq!(report.stats.details_fetched, 2);
    assert_eq!(report.stats.details_failed, 1);
    assert_eq!(report.stats.pages_failed, 0);
}

#[tokio::test]
async fn test_details_are_not_fetched_by_default() {
    let scraper = MockScraper::from_pages([results_page(1, 2)]);
    let crawler = crawler_for(&scraper);

    let report = crawler.crawl(&config()).await.unwrap();

    assert!(scraper.requested_listings().is_empty());
    assert!(report.listings.iter().all(|l| l.details.is_none()));
}

#[tokio::test(start_paused = true)]
async fn test_delay_before_each_listing_page() {
    let scraper = MockScraper::from_pages([results_page(1, 2)]);
    let crawler = crawler_for(&scraper);
    let config = config()
        .with_delay(Duration::from_secs(1))
        .with_enrich_details(true);

    let start = tokio::time::Instant::now();
    crawler.crawl(&config).await.unwrap();

    // One pause after page 1, then one before each of the two listing pages.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(3), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(4), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_aborted_session_skips_enrichment() {
    let mut responses = HashMap::new();
    responses.insert(1, MockResponse::Html(results_page(1, 2)));
    responses.insert(2, MockResponse::Timeout);
    let scraper = MockScraper::new(responses);
    let crawler = crawler_for(&scraper);

    let err = crawler
        .crawl(&config().with_enrich_details(true))
        .await
        .unwrap_err();

    assert_eq!(err.partial().unwrap().listings.len(), 2);
    assert!(scraper.requested_listings().is_empty());
}

#[tokio::test]
async fn test_enrichment_requires_detail_rules() {
    let scraper = MockScraper::from_pages([results_page(1, 2)]);
    let crawler = crawler_for(&scraper);
    let config = CrawlConfig::new(
        "https://www.idealista.pt/comprar-casas/lisboa/pagina-{page}",
        ExtractorVariant::Idealista,
    )
    .with_enrich_details(true);

    let result = crawler.crawl(&config).await;

    assert!(matches!(
        result,
        Err(CrawlError::Config(ConfigError::MissingDetailRules(_)))
    ));
    assert!(scraper.requested_pages().is_empty());
}

#[tokio::test]
async fn test_pagination_widget_lowers_page_bound() {
    let pager = r#"<ul class="pager"><li>1</li><li>2</li><li>Seguinte</li></ul>"#;
    let pages: Vec<String> = (1..=5)
        .map(|p| results_page(p, 2).replace("</body>", &format!("{}</body>", pager)))
        .collect();
    let scraper = MockScraper::from_pages(pages);
    let crawler = crawler_for(&scraper);
    let rules = ExtractorVariant::Imovirtual
        .rules()
        .with_pagination_selector("ul.pager li");
    let config = CrawlConfig::new(TEMPLATE, ExtractorVariant::Custom(rules))
        .with_delay(Duration::ZERO);

    let report = crawler.crawl(&config).await.unwrap();

    assert_eq!(report.state, CrawlState::StoppedByMaxPages);
    assert_eq!(scraper.requested_pages(), vec![1, 2]);
    assert_eq!(report.listings.len(), 4);
}

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/comprar"))
        .and(query_param("page", page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_over_http() {
    let server = MockServer::start().await;
    mount_page(&server, "1", results_page(1, 3)).await;
    mount_page(&server, "2", results_page(2, 2)).await;
    mount_page(&server, "3", "<html><body></body></html>".to_string()).await;

    let config = CrawlConfig::new(
        &format!("{}/comprar?page={{page}}", server.uri()),
        ExtractorVariant::Imovirtual,
    )
    .with_delay(Duration::from_millis(10));

    let report = crawl(&config).await.unwrap();

    assert_eq!(report.state, CrawlState::StoppedByEmptyPage { page_index: 3 });
    assert_eq!(report.listings.len(), 5);
    assert_eq!(
        report.listings[0].url.as_str(),
        format!("{}/anuncio/p1-1", server.uri())
    );
    assert_eq!(report.stats.pages_requested, 3);
}

#[tokio::test]
async fn test_crawl_all_runs_independent_sessions() {
    let healthy = MockServer::start().await;
    mount_page(&healthy, "1", results_page(1, 2)).await;
    mount_page(&healthy, "2", "<html><body></body></html>".to_string()).await;

    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&broken)
        .await;

    let configs = vec![
        CrawlConfig::new(
            &format!("{}/comprar?page={{page}}", healthy.uri()),
            ExtractorVariant::Imovirtual,
        )
        .with_name("healthy")
        .with_delay(Duration::ZERO),
        CrawlConfig::new(
            &format!("{}/comprar?page={{page}}", broken.uri()),
            ExtractorVariant::Imovirtual,
        )
        .with_name("broken")
        .with_delay(Duration::ZERO),
    ];

    let results = crawl_all(&configs).await;

    assert_eq!(results.len(), 2);
    let healthy_report = results[0].as_ref().unwrap();
    assert_eq!(healthy_report.name, "healthy");
    assert_eq!(healthy_report.listings.len(), 2);

    let broken_err = results[1].as_ref().unwrap_err();
    assert_eq!(broken_err.partial().unwrap().name, "broken");
    assert!(broken_err.partial().unwrap().listings.is_empty());
}
