use crux_core::testing::AppTester;
use crux_core::Request;
use crux_http::protocol::{HttpRequest, HttpResponse, HttpResult};
use shared::{ApiConfig, App, Effect, Event, Model, Notice, NoticeReason, Phase, ViewState};

type Tester = AppTester<App, Effect>;

fn configured() -> (Tester, Model) {
    let app = Tester::default();
    let mut model = Model::default();
    app.update(
        Event::Configure(Box::new(ApiConfig::default().with_api_key("test-key"))),
        &mut model,
    );
    (app, model)
}

/// A Pixabay response with ids `start..end` and the given `totalHits`.
fn pixabay_page(start: u64, end: u64, total_hits: u64) -> HttpResult {
    let hits: Vec<serde_json::Value> = (start..end)
        .map(|id| {
            serde_json::json!({
                "id": id,
                "webformatURL": format!("https://pixabay.com/get/{id}_640.jpg"),
                "largeImageURL": format!("https://pixabay.com/get/{id}_1280.jpg"),
                "tags": format!("cat, animal, {id}"),
            })
        })
        .collect();
    let body = serde_json::json!({ "total": total_hits, "totalHits": total_hits, "hits": hits });
    HttpResult::Ok(HttpResponse::ok().json(body).build())
}

fn query_param(request: &Request<HttpRequest>, name: &str) -> Option<String> {
    let url = url::Url::parse(&request.operation.url).unwrap();
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

fn only_request(effects: Vec<Effect>) -> Request<HttpRequest> {
    let mut requests: Vec<_> = effects
        .into_iter()
        .filter_map(|e| match e {
            Effect::Http(request) => Some(request),
            _ => None,
        })
        .collect();
    assert_eq!(requests.len(), 1, "expected exactly one request: {requests:?}");
    requests.remove(0)
}

fn notices(effects: &[Effect]) -> Vec<Notice> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Notify(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect()
}

/// Resolves `request` and feeds the resulting events back into the app, the
/// way `crux_core::Core` would. Returns every effect raised along the way.
fn resolve(
    app: &Tester,
    request: &mut Request<HttpRequest>,
    result: HttpResult,
    model: &mut Model,
) -> Vec<Effect> {
    let update = app.resolve(request, result).expect("request resolves");
    let mut effects = update.effects;
    for event in update.events {
        effects.extend(app.update(event, model).effects);
    }
    effects
}

fn submit(app: &Tester, model: &mut Model, query: &str) -> Vec<Effect> {
    app.update(
        Event::SearchSubmitted {
            query: query.to_string(),
        },
        model,
    )
    .effects
}

#[test]
fn test_search_then_load_more() {
    let (app, mut model) = configured();

    // 1. Submit "cats"
    let mut request = only_request(submit(&app, &mut model, "cats"));
    assert_eq!(query_param(&request, "q").as_deref(), Some("cats"));
    assert_eq!(query_param(&request, "page").as_deref(), Some("1"));
    assert_eq!(query_param(&request, "per_page").as_deref(), Some("12"));
    assert_eq!(app.view(&model).state, ViewState::Loading);

    // 2. First page: 12 of 120
    let effects = resolve(&app, &mut request, pixabay_page(0, 12, 120), &mut model);
    assert!(effects.iter().any(|e| matches!(e, Effect::Render(_))));
    let view = app.view(&model);
    assert_eq!(view.gallery.len(), 12);
    assert_eq!(view.total_hits, 120);
    assert_eq!(view.page, 1);
    assert!(view.load_more_visible);

    // 3. Load more
    let update = app.update(Event::LoadMoreRequested, &mut model);
    let mut request = only_request(update.effects);
    assert_eq!(query_param(&request, "page").as_deref(), Some("2"));
    assert_eq!(query_param(&request, "q").as_deref(), Some("cats"));
    assert!(!app.view(&model).load_more_visible);

    // 4. Second page appended
    resolve(&app, &mut request, pixabay_page(12, 24, 120), &mut model);
    let view = app.view(&model);
    assert_eq!(view.gallery.len(), 24);
    assert_eq!(view.gallery[0].id, 0);
    assert_eq!(view.gallery[23].id, 23);
    assert_eq!(view.page, 2);
    assert!(view.load_more_visible);
}

#[test]
fn test_fresh_search_resets_counters_while_loading() {
    let (app, mut model) = configured();
    let mut request = only_request(submit(&app, &mut model, "cats"));
    resolve(&app, &mut request, pixabay_page(0, 12, 120), &mut model);
    let mut request = only_request(app.update(Event::LoadMoreRequested, &mut model).effects);
    resolve(&app, &mut request, pixabay_page(12, 24, 120), &mut model);

    let mut request = only_request(submit(&app, &mut model, "dogs"));
    let view = app.view(&model);
    assert_eq!(view.state, ViewState::Loading);
    assert_eq!(view.query, "dogs");
    assert_eq!(view.page, 1);
    assert_eq!(view.total_hits, 0);
    assert!(view.gallery.is_empty());

    resolve(&app, &mut request, pixabay_page(500, 503, 3), &mut model);
    let view = app.view(&model);
    assert_eq!(view.query, "dogs");
    assert_eq!(view.total_hits, 3);
    assert_eq!(view.gallery.len(), 3);
}

#[test]
fn test_empty_query_never_hits_network() {
    let (app, mut model) = configured();

    let effects = submit(&app, &mut model, "   ");

    assert!(!effects.iter().any(|e| matches!(e, Effect::Http(_))));
    let notices = notices(&effects);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].reason, NoticeReason::EmptyQuery);
    assert_eq!(model.search.phase, Phase::Idle);
}

#[test]
fn test_zero_results_notifies_exactly_once() {
    let (app, mut model) = configured();

    let effects = submit(&app, &mut model, "zzzznotfound");
    assert!(notices(&effects).is_empty());

    let mut request = only_request(effects);
    let effects = resolve(&app, &mut request, pixabay_page(0, 0, 0), &mut model);

    let notices = notices(&effects);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].reason, NoticeReason::NoResults);

    let view = app.view(&model);
    assert!(view.gallery.is_empty());
    assert!(!view.load_more_visible);
    assert_eq!(view.state, ViewState::Ready { has_more: false });
}

#[test]
fn test_failed_load_more_keeps_gallery_and_allows_retry() {
    let (app, mut model) = configured();
    let mut request = only_request(submit(&app, &mut model, "cats"));
    resolve(&app, &mut request, pixabay_page(0, 12, 120), &mut model);

    let mut request = only_request(app.update(Event::LoadMoreRequested, &mut model).effects);
    let response = HttpResponse::status(500)
        .body("Internal Server Error")
        .build();
    let effects = resolve(&app, &mut request, HttpResult::Ok(response), &mut model);

    let notices = notices(&effects);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].reason, NoticeReason::FetchFailed);
    assert_eq!(notices[0].message, "An error occurred while fetching images.");

    let view = app.view(&model);
    assert_eq!(view.gallery.len(), 12);
    assert_eq!(view.page, 1);
    assert!(matches!(view.state, ViewState::Error { is_retryable: true, .. }));
    assert!(view.load_more_visible);

    // Retry asks for page 2 again.
    let request = only_request(app.update(Event::LoadMoreRequested, &mut model).effects);
    assert_eq!(query_param(&request, "page").as_deref(), Some("2"));
}

#[test]
fn test_network_failure_on_first_search() {
    let (app, mut model) = configured();
    let mut request = only_request(submit(&app, &mut model, "cats"));
    resolve(
        &app,
        &mut request,
        HttpResult::Err(crux_http::Error::Timeout),
        &mut model,
    );

    let view = app.view(&model);
    assert!(view.gallery.is_empty());
    assert!(!view.load_more_visible);
    assert!(matches!(view.state, ViewState::Error { .. }));
}

#[test]
fn test_newer_search_wins_over_stale_response() {
    let (app, mut model) = configured();

    let mut first = only_request(submit(&app, &mut model, "cats"));
    let mut second = only_request(submit(&app, &mut model, "dogs"));

    resolve(&app, &mut second, pixabay_page(100, 105, 5), &mut model);
    let effects = resolve(&app, &mut first, pixabay_page(0, 12, 120), &mut model);

    assert!(effects.is_empty());
    let view = app.view(&model);
    assert_eq!(view.query, "dogs");
    assert_eq!(view.gallery.len(), 5);
    assert_eq!(view.gallery[0].id, 100);
}

#[test]
fn test_rate_limit_is_retryable() {
    let (app, mut model) = configured();
    let mut request = only_request(submit(&app, &mut model, "cats"));
    let response = HttpResponse::status(429).build();
    resolve(&app, &mut request, HttpResult::Ok(response), &mut model);

    match app.view(&model).state {
        ViewState::Error {
            message,
            is_retryable,
        } => {
            assert!(is_retryable);
            assert!(message.contains("Too many searches"));
        }
        other => panic!("expected error state, got {other:?}"),
    }
}

#[test]
fn test_timeout_above_limit_fails_configuration() {
    let app = Tester::default();
    let mut model = Model::default();
    let mut config = ApiConfig::default().with_api_key("test-key");
    config.request_timeout_ms = 600_000;
    app.update(Event::Configure(Box::new(config)), &mut model);

    let effects = submit(&app, &mut model, "cats");
    assert!(!effects.iter().any(|e| matches!(e, Effect::Http(_))));
    assert_eq!(model.search.phase, Phase::Error);
    match app.view(&model).state {
        ViewState::Error { is_retryable, .. } => assert!(!is_retryable),
        other => panic!("expected error state, got {other:?}"),
    }
}
