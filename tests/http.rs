use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct RecordResponse {
    id: String,
    date: String,
    leads: u64,
    sales: u64,
}

#[derive(Debug, Deserialize)]
struct Rates {
    conversion: String,
}

#[derive(Debug, Deserialize)]
struct Totals {
    leads: u64,
    sales: u64,
}

#[derive(Debug, Deserialize)]
struct Metrics {
    totals: Totals,
    rates: Rates,
}

#[derive(Debug, Deserialize)]
struct DashboardResponse {
    record_count: usize,
    metrics: Metrics,
}

#[derive(Debug, Deserialize)]
struct SettingsResponse {
    #[serde(rename = "monthlyGoal")]
    monthly_goal: f64,
    logo: Option<String>,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

const STORAGE_QUOTA: usize = 4096;

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_dir() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("sales_dashboard_http_{}_{}", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/settings")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_sales_dashboard"))
        .env("PORT", port.to_string())
        .env("APP_DATA_DIR", unique_data_dir())
        .env("APP_STORAGE_QUOTA_BYTES", STORAGE_QUOTA.to_string())
        .env_remove("CRM_URL")
        .env_remove("CRM_API_KEY")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

#[tokio::test]
async fn http_added_record_is_filtered_and_aggregated() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/records", server.base_url))
        .json(&json!({ "date": "2031-07-15", "leads": 40, "sales": 4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: RecordResponse = response.json().await.unwrap();
    assert!(!created.id.is_empty());

    let in_range: Vec<RecordResponse> = client
        .get(format!(
            "{}/api/records?start=2031-07-15&end=2031-07-15",
            server.base_url
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(in_range.len(), 1);
    assert_eq!(in_range[0].id, created.id);
    assert_eq!(in_range[0].date, "2031-07-15");

    let dashboard: DashboardResponse = client
        .get(format!(
            "{}/api/dashboard?start=2031-07-01&end=2031-07-31",
            server.base_url
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dashboard.record_count, 1);
    assert_eq!(dashboard.metrics.totals.leads, 40);
    assert_eq!(dashboard.metrics.totals.sales, 4);
    assert_eq!(dashboard.metrics.rates.conversion, "10.0");

    let response = client
        .delete(format!("{}/api/records/{}", server.base_url, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn http_edit_keeps_record_id() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let created: RecordResponse = client
        .post(format!("{}/api/records", server.base_url))
        .json(&json!({ "date": "2031-08-01", "leads": 10 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let edited: RecordResponse = client
        .put(format!("{}/api/records/{}", server.base_url, created.id))
        .json(&json!({ "date": "2031-08-02", "leads": 12, "sales": 1 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(edited.id, created.id);
    assert_eq!(edited.leads, 12);
    assert_eq!(edited.sales, 1);

    let missing = client
        .put(format!("{}/api/records/does-not-exist", server.base_url))
        .json(&json!({ "leads": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    client
        .delete(format!("{}/api/records/{}", server.base_url, created.id))
        .send()
        .await
        .unwrap();
}

#[tokio::test]
async fn http_rejects_bad_month_and_date() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/api/records?month=13", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/api/records", server.base_url))
        .json(&json!({ "date": "15/07/2031" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_oversized_settings_keep_previous_values() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .put(format!("{}/api/settings", server.base_url))
        .json(&json!({ "monthlyGoal": 75000.0 }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let logo = format!("data:image/png;base64,{}", "A".repeat(STORAGE_QUOTA));
    let response = client
        .put(format!("{}/api/settings", server.base_url))
        .json(&json!({ "monthlyGoal": 1.0, "logo": logo }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INSUFFICIENT_STORAGE);
    assert!(response.text().await.unwrap().contains("quota"));

    let settings: SettingsResponse = client
        .get(format!("{}/api/settings", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(settings.monthly_goal, 75000.0);
    assert_eq!(settings.logo, None);
}

#[tokio::test]
async fn http_crm_routes_need_a_gateway() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/api/leads", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn http_views_follow_role() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let views: Vec<String> = client
        .get(format!("{}/api/views?role=vendedor", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(views, vec!["dashboard", "crm"]);
}
