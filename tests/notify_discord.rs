// tests/notify_discord.rs
//
// DiscordSink against a local mock of the bot REST API.

use relay_bot::notify::{DiscordSink, DispatchMessage, DispatchSink};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn message() -> DispatchMessage {
    DispatchMessage {
        title: "Fresh meme".into(),
        url: "https://reddit.com/r/memes/comments/n1/fresh/".into(),
        image_url: Some("https://i.redd.it/n1.png".into()),
        footer: "Posted on Reddit".into(),
    }
}

#[tokio::test]
async fn send_posts_content_and_embed_with_bot_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channels/42/messages"))
        .and(header("authorization", "Bot t0ken"))
        .and(body_partial_json(json!({
            "content": "**Fresh meme**\nhttps://reddit.com/r/memes/comments/n1/fresh/",
            "embeds": [{
                "title": "Fresh meme",
                "url": "https://reddit.com/r/memes/comments/n1/fresh/",
                "image": { "url": "https://i.redd.it/n1.png" },
                "footer": { "text": "Posted on Reddit" }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "m1" })))
        .expect(1)
        .mount(&server)
        .await;

    let sink = DiscordSink::new("t0ken".into()).with_api_base(&server.uri());
    sink.send("42", &message()).await.expect("send ok");
}

#[tokio::test]
async fn unknown_channel_is_sink_unavailable_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channels/404/messages"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let sink = DiscordSink::new("t".into())
        .with_api_base(&server.uri())
        .with_retries(3);
    let err = sink.send("404", &message()).await.unwrap_err();
    assert_eq!(err.kind(), "sink_unavailable");
    assert!(err.to_string().contains("could not be resolved"));
}

#[tokio::test]
async fn server_errors_are_retried_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channels/7/messages"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&server)
        .await;

    let sink = DiscordSink::new("t".into())
        .with_api_base(&server.uri())
        .with_retries(2);
    assert!(sink.send("7", &message()).await.is_err());
}

#[tokio::test]
async fn default_sink_makes_a_single_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channels/7/messages"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let sink = DiscordSink::new("t".into()).with_api_base(&server.uri());
    assert!(sink.send("7", &message()).await.is_err());
}

#[tokio::test]
async fn probe_returns_bot_username() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .and(header("authorization", "Bot t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "1", "username": "relay" })))
        .mount(&server)
        .await;

    let sink = DiscordSink::new("t".into()).with_api_base(&server.uri());
    assert_eq!(sink.probe().await.unwrap(), "relay");
}
