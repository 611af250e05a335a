//! Live browser tests.
//!
//! These need Chrome plus a chromedriver reachable through the usual
//! resolution chain. Run with `cargo test -p kuit-webdriver -- --ignored`.

use futures::FutureExt;
use kuit_common::locator::Locator;
use kuit_engine::config::BrowserConfig;
use kuit_engine::session::Session;
use kuit_webdriver::{ChromeSession, with_session};
use serial_test::serial;

const FORM: &str = "data:text/html,<html><head><title>kuit form</title></head><body>\
<input id='name-input' value='old'>\
<select id='qos'><option>basic</option><option>premium</option></select>\
<div style='height:2000px'></div>\
<button class='btn submit' id='go'>Go</button>\
</body></html>";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[tokio::test]
#[serial]
#[ignore] // Requires Chrome and chromedriver
async fn test_session_lifecycle() {
    init_tracing();
    let mut session = ChromeSession::acquire(&BrowserConfig::default())
        .await
        .expect("Failed to acquire a browser session");

    let nav = session.navigate(FORM).await.expect("Navigation failed");
    assert_eq!(nav.title, "kuit form");

    let input = session.find_all(&Locator::id("name-input")).await.unwrap()[0];
    session.clear(input).await.unwrap();
    session.type_text(input, "Test_Circuit_001").await.unwrap();
    assert_eq!(
        session.attribute(input, "value").await.unwrap().as_deref(),
        Some("Test_Circuit_001")
    );

    let select = session.find_all(&Locator::id("qos")).await.unwrap()[0];
    session.select_by_text(select, "premium").await.unwrap();

    let button = session
        .find_all(&Locator::class_name("btn submit"))
        .await
        .unwrap()[0];
    assert!(session.vertical_position(button).await.unwrap() > 1000.0);
    session.scroll_into_view(button).await.unwrap();
    session.script_click(button).await.unwrap();

    assert!(session.find_all(&Locator::id("missing")).await.unwrap().is_empty());

    session.release().await.expect("Release failed");
}

#[tokio::test]
#[serial]
#[ignore] // Requires Chrome and chromedriver
async fn test_scoped_session_returns_body_value() {
    init_tracing();
    let title = with_session(&BrowserConfig::default(), |session| {
        async move {
            session.navigate(FORM).await.unwrap();
            session.title().await.unwrap()
        }
        .boxed()
    })
    .await
    .expect("Failed to acquire a browser session");
    assert_eq!(title, "kuit form");
}
