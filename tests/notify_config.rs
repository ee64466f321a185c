use serial_test::serial;
use std::env;

use tech_news_digest::config::digest::{Channel, NotifyConfig};
use tech_news_digest::NotifierMux;

fn cfg(channels: Vec<Channel>) -> NotifyConfig {
    NotifyConfig { channels }
}

#[test]
#[serial]
fn selected_channel_without_credentials_is_fatal() {
    env::remove_var("SLACK_WEBHOOK_URL");
    let err = NotifierMux::from_config(&cfg(vec![Channel::Stdout, Channel::Slack]))
        .err()
        .expect("missing webhook must fail");
    assert!(format!("{err:#}").contains("SLACK_WEBHOOK_URL"));
}

#[test]
#[serial]
fn github_repository_must_be_owner_slash_repo() {
    env::set_var("GITHUB_TOKEN", "ghp_test");
    env::set_var("GITHUB_REPOSITORY", "just-a-name");
    assert!(NotifierMux::from_config(&cfg(vec![Channel::Github])).is_err());

    env::set_var("GITHUB_REPOSITORY", "octo/digest");
    let mux = NotifierMux::from_config(&cfg(vec![Channel::Github])).unwrap();
    assert_eq!(mux.len(), 1);

    env::remove_var("GITHUB_TOKEN");
    env::remove_var("GITHUB_REPOSITORY");
}

#[test]
#[serial]
fn webhook_channels_build_from_env() {
    env::set_var("SLACK_WEBHOOK_URL", "https://hooks.slack.test/x");
    env::set_var("DISCORD_WEBHOOK_URL", "https://discord.test/api/webhooks/1/abc");
    let mux = NotifierMux::from_config(&cfg(vec![Channel::Slack, Channel::Discord, Channel::Stdout]))
        .unwrap();
    assert_eq!(mux.len(), 3);
    env::remove_var("SLACK_WEBHOOK_URL");
    env::remove_var("DISCORD_WEBHOOK_URL");
}

#[test]
fn empty_channel_list_is_rejected() {
    assert!(NotifierMux::from_config(&cfg(Vec::new())).is_err());
}
