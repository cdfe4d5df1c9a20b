mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mangawatch_core::{
    handle_command, spawn_scheduler, AnnounceError, AnnounceOutcome, Command, CycleSettings,
    DailySchedule, DiscordRest, MangaDexClient, Message, PollConfig, Reply, SiteLinks, Trigger,
    UpdateCycle, CHECKED_ACK,
};
use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{chapter, RecordingResolver, StaticSource};

fn settings(tracked: &[&str]) -> CycleSettings {
    CycleSettings {
        tracked: tracked.iter().map(|id| (*id).into()).collect(),
        channel_id: "chan".into(),
        links: SiteLinks::default(),
    }
}

#[tokio::test]
async fn scheduled_cycle_announces_once_then_reports_up_to_date() {
    let mangadex = MockServer::start().await;
    let discord = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/manga/m1/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "data": [{ "id": "c5", "attributes": { "title": "Foo", "chapter": "12" } }]
        })))
        .mount(&mangadex)
        .await;

    Mock::given(method("GET"))
        .and(path("/channels/chan"))
        .and(header("authorization", "Bot discord-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "chan", "type": 0 })))
        .mount(&discord)
        .await;
    Mock::given(method("POST"))
        .and(path("/channels/chan/messages"))
        .and(body_partial_json(json!({
            "content": "**Foo** - Chapter 12\nRead here: https://mangadex.org/chapter/c5"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg1" })))
        .expect(1)
        .mount(&discord)
        .await;
    Mock::given(method("POST"))
        .and(path("/channels/chan/messages"))
        .and(body_partial_json(json!({
            "embeds": [{ "title": "Manga Update Status", "color": 0x00ff00 }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg2" })))
        .expect(1)
        .mount(&discord)
        .await;

    let source = MangaDexClient::new(
        Client::new(),
        PollConfig {
            api_url: mangadex.uri(),
            ..PollConfig::default()
        },
    );
    let rest = DiscordRest::new(Client::new(), "discord-token").with_api_url(discord.uri());
    let cycle = UpdateCycle::new(Arc::new(source), Arc::new(rest), settings(&["m1"]));

    let first = cycle.run(Trigger::Scheduled).await;
    assert_eq!(first.outcome, AnnounceOutcome::Announced { posted: 1, failed: 0 });
    assert!(cycle.seen_snapshot().await.contains("c5"));

    let second = cycle.run(Trigger::Scheduled).await;
    assert_eq!(second.outcome, AnnounceOutcome::UpToDate { delivered: true });
    assert_eq!(cycle.seen_snapshot().await.len(), 1);
}

#[tokio::test]
async fn unknown_discord_channel_leaves_state_untouched() {
    let discord = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels/chan"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({ "message": "Unknown Channel", "code": 10003 })),
        )
        .mount(&discord)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&discord)
        .await;

    let source = StaticSource::new().with_item("m1", chapter("c5", "Foo", "12"));
    let rest = DiscordRest::new(Client::new(), "t").with_api_url(discord.uri());
    let cycle = UpdateCycle::new(Arc::new(source), Arc::new(rest), settings(&["m1"]));

    let report = cycle.run(Trigger::Scheduled).await;

    assert_eq!(report.outcome, AnnounceOutcome::ChannelUnavailable);
    assert!(cycle.seen_snapshot().await.is_empty());
}

#[tokio::test]
async fn discord_errors_carry_api_message() {
    let discord = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels/chan"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "message": "Missing Access" })),
        )
        .mount(&discord)
        .await;

    let rest = DiscordRest::new(Client::new(), "t").with_api_url(discord.uri());
    let err = mangawatch_core::ChannelResolver::resolve(&rest, "chan")
        .await
        .err()
        .expect("forbidden channel");
    match err {
        AnnounceError::Api { status, message } => {
            assert_eq!(status.as_u16(), 403);
            assert_eq!(message, "Missing Access");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn registering_commands_puts_both_definitions() {
    let discord = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/applications/app/guilds/guild/commands"))
        .and(body_partial_json(json!([
            { "name": "checkupdates" },
            { "name": "version" }
        ])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&discord)
        .await;

    let rest = DiscordRest::new(Client::new(), "t").with_api_url(discord.uri());
    rest.register_guild_commands("app", "guild")
        .await
        .expect("registration succeeds");
}

#[tokio::test]
async fn overlapping_triggers_run_one_after_the_other() {
    let source = StaticSource::new()
        .with_item("m1", chapter("c1", "Foo", "1"))
        .with_delay(Duration::from_millis(50));
    let resolver = RecordingResolver::new();
    let cycle = Arc::new(UpdateCycle::new(
        Arc::new(source),
        Arc::new(resolver.clone()),
        settings(&["m1"]),
    ));

    let scheduled = tokio::spawn({
        let cycle = Arc::clone(&cycle);
        async move { cycle.run(Trigger::Scheduled).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let manual = cycle.run(Trigger::Manual).await;
    let scheduled = scheduled.await.expect("scheduled cycle");

    // The scheduled run took the lock first and recorded c1; the manual run
    // only started afterwards and re-announced it.
    assert_eq!(scheduled.outcome, AnnounceOutcome::Announced { posted: 1, failed: 0 });
    assert_eq!(manual.outcome, AnnounceOutcome::Announced { posted: 1, failed: 0 });
    assert_eq!(resolver.texts().len(), 2);
    assert_eq!(cycle.seen_snapshot().await.len(), 1);
}

#[derive(Default)]
struct CollectingReply {
    deferred: bool,
    sent: Vec<Message>,
}

#[async_trait]
impl Reply for CollectingReply {
    async fn defer(&mut self) -> Result<(), AnnounceError> {
        self.deferred = true;
        Ok(())
    }

    async fn send(&mut self, message: Message) -> Result<(), AnnounceError> {
        self.sent.push(message);
        Ok(())
    }
}

#[tokio::test]
async fn check_command_acknowledges_even_when_posting_fails() {
    let source = StaticSource::new()
        .with_item("m1", chapter("c1", "Foo", "1"))
        .with_failure("m2");
    let resolver = RecordingResolver::rejecting("Foo");
    let cycle = UpdateCycle::new(Arc::new(source), Arc::new(resolver.clone()), settings(&["m1", "m2"]));
    let mut reply = CollectingReply::default();

    handle_command(Command::CheckUpdates, &cycle, &mut reply)
        .await
        .expect("reply delivered");

    assert!(reply.deferred);
    assert_eq!(reply.sent, vec![Message::Text(CHECKED_ACK.to_owned())]);
    assert!(resolver.posts().is_empty());
    assert!(cycle.seen_snapshot().await.is_empty());
}

#[tokio::test]
async fn version_command_replies_with_embed() {
    let source = StaticSource::new();
    let cycle = UpdateCycle::new(Arc::new(source), Arc::new(RecordingResolver::new()), settings(&[]));
    let mut reply = CollectingReply::default();

    handle_command(Command::Version, &cycle, &mut reply)
        .await
        .expect("reply delivered");

    assert!(!reply.deferred);
    match reply.sent.as_slice() {
        [Message::Embed(embed)] => assert_eq!(embed.title, "Bot Version"),
        other => panic!("unexpected replies: {other:?}"),
    }
}

#[tokio::test]
async fn scheduler_runs_cycles_until_stopped() {
    let source = Arc::new(StaticSource::new().with_item("m1", chapter("c1", "Foo", "1")));
    let resolver = RecordingResolver::new();
    let cycle = Arc::new(UpdateCycle::new(
        source.clone(),
        Arc::new(resolver.clone()),
        settings(&["m1"]),
    ));

    let every_second = DailySchedule::parse("* * * * * *").expect("valid cron");
    let handle = spawn_scheduler(every_second, cycle);

    tokio::time::timeout(Duration::from_secs(5), async {
        while source.calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("scheduler fired within five seconds");

    handle.stop().await.expect("stop scheduler");
}
