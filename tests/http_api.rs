use std::sync::Arc;
use std::thread;
use std::time::Duration;

use blog_reader::api::{self, CommentQuery, SortMode};
use blog_reader::controller::{self, Controller};
use blog_reader::data::HttpCommentService;
use blog_reader::storage::Store;
use parking_lot::Mutex;
use tiny_http::{Header, Response, Server};
use url::Url;

const WAIT: Duration = Duration::from_secs(10);

struct FakeApi {
    base_url: String,
    requests: Arc<Mutex<Vec<Vec<(String, String)>>>>,
}

/// Serves `total` comments over `GET /comment`, 66 per page. Requests for
/// `fail_page` get a 500.
fn spawn_api(total: i64, fail_page: Option<u32>) -> FakeApi {
    let server = Server::http("127.0.0.1:0").expect("bind fake api");
    let base_url = format!("http://{}", server.server_addr());
    let requests: Arc<Mutex<Vec<Vec<(String, String)>>>> = Arc::default();
    let log = requests.clone();

    thread::spawn(move || {
        for request in server.incoming_requests() {
            let url = Url::parse(&format!("http://fake{}", request.url())).expect("request url");
            let params: Vec<(String, String)> = url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            log.lock().push(params.clone());

            if url.path() != "/comment" {
                let _ = request.respond(Response::from_string("not found").with_status_code(404));
                continue;
            }
            let page: u32 = param(&params, "page").parse().unwrap_or(1);
            if Some(page) == fail_page {
                let _ = request.respond(Response::from_string("boom").with_status_code(500));
                continue;
            }
            let response = Response::from_string(page_body(total, page)).with_header(
                Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                    .expect("valid header"),
            );
            let _ = request.respond(response);
        }
    });

    FakeApi { base_url, requests }
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> &'a str {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .unwrap_or("")
}

fn page_body(total: i64, page: u32) -> String {
    let per_page = 66_i64;
    let total_page = (total + per_page - 1) / per_page;
    let start = (i64::from(page) - 1) * per_page + 1;
    let end = (start + per_page - 1).min(total);
    let data: Vec<String> = (start..=end)
        .map(|id| {
            format!(
                r#"{{"id":{id},"post_id":3,"pid":0,"content":"comment {id}","author":{{"name":"user{id}"}},"likes":0,"created_at":"2020-01-01T00:00:00.000Z"}}"#
            )
        })
        .collect();
    format!(
        r#"{{"code":1,"message":"ok","result":{{"data":[{}],"pagination":{{"current_page":{page},"total_page":{total_page},"total":{total},"per_page":66}}}}}}"#,
        data.join(",")
    )
}

fn client(base_url: &str) -> api::Client {
    api::Client::new(api::ClientConfig {
        user_agent: "blog-reader-tests".into(),
        base_url: Some(base_url.to_string()),
        timeout: Some(Duration::from_secs(5)),
        http_client: None,
    })
    .expect("build client")
}

#[test]
fn client_sends_comment_query() {
    let fake = spawn_api(70, None);
    let page = client(&fake.base_url)
        .comments(&CommentQuery::new(3, SortMode::Hot, 2))
        .expect("fetch comments");

    assert_eq!(page.data.len(), 4);
    assert_eq!(page.data[0].id, 67);
    assert_eq!(page.pagination.current_page, 2);
    assert_eq!(page.pagination.total_page, 2);

    let requests = fake.requests.lock();
    let params = &requests[0];
    assert_eq!(param(params, "sort"), "2");
    assert_eq!(param(params, "post_id"), "3");
    assert_eq!(param(params, "per_page"), "66");
    assert_eq!(param(params, "page"), "2");
}

#[test]
fn client_reports_server_errors() {
    let fake = spawn_api(70, Some(1));
    let err = client(&fake.base_url)
        .comments(&CommentQuery::new(3, SortMode::Recent, 1))
        .unwrap_err();
    assert!(err.to_string().contains("500"), "error was: {err:#}");
}

#[test]
fn controller_pages_through_http_api() {
    let fake = spawn_api(200, None);
    let service = Arc::new(HttpCommentService::new(Arc::new(client(&fake.base_url))));
    let store = Arc::new(Store::open_in_memory().expect("store"));
    let mut ctl = Controller::new(controller::Options::new(service, store));

    ctl.initialize(3);
    ctl.wait_idle(WAIT).expect("first page");
    assert_eq!(ctl.comments().len(), 66);

    while ctl.load_more().is_some() {
        ctl.wait_idle(WAIT).expect("next page");
    }
    assert_eq!(ctl.comments().len(), 200);
    assert!(ctl.is_no_more_data());
    assert_eq!(ctl.pagination().map(|p| p.current_page), Some(4));
    assert_eq!(fake.requests.lock().len(), 4);
}

#[test]
fn controller_surfaces_fetch_errors() {
    let fake = spawn_api(200, Some(2));
    let service = Arc::new(HttpCommentService::new(Arc::new(client(&fake.base_url))));
    let store = Arc::new(Store::open_in_memory().expect("store"));
    let mut ctl = Controller::new(controller::Options::new(service, store));

    ctl.initialize(3);
    ctl.wait_idle(WAIT).expect("first page");
    ctl.load_more();
    let err = ctl.wait_idle(WAIT).unwrap_err();
    assert!(matches!(err, controller::Error::Fetch { page: 2, .. }));
    assert!(!ctl.is_loading());
    assert_eq!(ctl.comments().len(), 66);
}
