//! Slack Web API client.
//!
//! Only the handful of methods the bridge needs. Every reply carries an `ok`
//! flag; replies with `ok: false` are turned into [`SlackError::Api`].

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::common::error::{SlackError, SlackResult};

const SLACK_API_URL: &str = "https://slack.com/api";

/// Page size for cursor-paginated listings.
const PAGE_LIMIT: &str = "200";

#[derive(Debug, Clone, Deserialize)]
pub struct RtmConnect {
    pub url: String,
    #[serde(rename = "self")]
    pub identity: SlackIdentity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackIdentity {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ConversationsPage {
    #[serde(default)]
    channels: Vec<Conversation>,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct MembersPage {
    members: Option<Vec<String>>,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

impl ResponseMetadata {
    fn cursor(metadata: Option<Self>) -> Option<String> {
        metadata
            .and_then(|m| m.next_cursor)
            .filter(|cursor| !cursor.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    user: SlackIdentity,
}

/// Channel name as Slack lists it, without a leading `#`.
pub fn bare_channel_name(name: &str) -> &str {
    name.strip_prefix('#').unwrap_or(name)
}

/// Check the `ok` flag of a reply and decode its payload.
fn decode_reply<T: DeserializeOwned>(method: &str, reply: Value) -> SlackResult<T> {
    if reply.get("ok").and_then(Value::as_bool) != Some(true) {
        let error = reply
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error")
            .to_string();
        return Err(SlackError::Api {
            method: method.to_string(),
            error,
        });
    }
    Ok(serde_json::from_value(reply)?)
}

pub struct SlackApi {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl SlackApi {
    pub fn new(token: impl Into<String>) -> SlackResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            token: token.into(),
            base_url: SLACK_API_URL.to_string(),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, form: &[(&str, &str)]) -> SlackResult<T> {
        trace!("Slack API call {}", method);

        let reply: Value = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .bearer_auth(&self.token)
            .form(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        decode_reply(method, reply)
    }

    /// Open a real-time messaging session.
    pub async fn rtm_connect(&self) -> SlackResult<RtmConnect> {
        self.call("rtm.connect", &[]).await
    }

    /// Find a public or private channel by name, with or without `#`.
    pub async fn find_channel(&self, name: &str) -> SlackResult<Conversation> {
        let wanted = bare_channel_name(name);
        let mut cursor = String::new();

        loop {
            let page: ConversationsPage = self
                .call(
                    "conversations.list",
                    &[
                        ("types", "public_channel,private_channel"),
                        ("exclude_archived", "true"),
                        ("limit", PAGE_LIMIT),
                        ("cursor", cursor.as_str()),
                    ],
                )
                .await?;

            if let Some(channel) = page.channels.into_iter().find(|c| c.name == wanted) {
                debug!("Resolved Slack channel #{} to {}", channel.name, channel.id);
                return Ok(channel);
            }

            match ResponseMetadata::cursor(page.response_metadata) {
                Some(next) => cursor = next,
                None => {
                    return Err(SlackError::ChannelNotFound {
                        name: name.to_string(),
                    })
                }
            }
        }
    }

    /// User ids of everyone in a channel.
    pub async fn channel_members(&self, channel_id: &str) -> SlackResult<Vec<String>> {
        let mut members = Vec::new();
        let mut cursor = String::new();

        loop {
            let page: MembersPage = self
                .call(
                    "conversations.members",
                    &[
                        ("channel", channel_id),
                        ("limit", PAGE_LIMIT),
                        ("cursor", cursor.as_str()),
                    ],
                )
                .await?;

            let Some(page_members) = page.members else {
                return Err(SlackError::MissingField {
                    method: "conversations.members".to_string(),
                    field: "members".to_string(),
                });
            };
            members.extend(page_members);

            match ResponseMetadata::cursor(page.response_metadata) {
                Some(next) => cursor = next,
                None => return Ok(members),
            }
        }
    }

    pub async fn user_info(&self, user_id: &str) -> SlackResult<SlackIdentity> {
        let info: UserInfo = self.call("users.info", &[("user", user_id)]).await?;
        Ok(info.user)
    }

    /// Post already-escaped text as the bot user.
    pub async fn post_message(&self, channel_id: &str, text: &str) -> SlackResult<()> {
        let _: Value = self
            .call(
                "chat.postMessage",
                &[("channel", channel_id), ("text", text), ("as_user", "true")],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_channel_name() {
        assert_eq!(bare_channel_name("#general"), "general");
        assert_eq!(bare_channel_name("general"), "general");
    }

    #[test]
    fn test_decode_rtm_connect() {
        let reply = json!({
            "ok": true,
            "url": "wss://example.slack.test/websocket/abc",
            "self": { "id": "UBOT", "name": "bridgebot" },
            "team": { "id": "T1", "name": "Team" }
        });

        let rtm: RtmConnect = decode_reply("rtm.connect", reply).unwrap();
        assert_eq!(rtm.url, "wss://example.slack.test/websocket/abc");
        assert_eq!(rtm.identity.id, "UBOT");
        assert_eq!(rtm.identity.name, "bridgebot");
    }

    #[test]
    fn test_error_reply() {
        let reply = json!({ "ok": false, "error": "invalid_auth" });

        let result: SlackResult<Value> = decode_reply("auth.test", reply);
        match result {
            Err(SlackError::Api { method, error }) => {
                assert_eq!(method, "auth.test");
                assert_eq!(error, "invalid_auth");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_ok_is_an_error() {
        let result: SlackResult<Value> = decode_reply("users.info", json!({}));
        assert!(matches!(result, Err(SlackError::Api { .. })));
    }

    #[test]
    fn test_members_field_may_be_absent() {
        let reply = json!({ "ok": true });
        let page: MembersPage = decode_reply("conversations.members", reply).unwrap();
        assert!(page.members.is_none());
    }

    #[test]
    fn test_pagination_cursor() {
        let page: ConversationsPage = decode_reply(
            "conversations.list",
            json!({
                "ok": true,
                "channels": [{ "id": "C1", "name": "general" }],
                "response_metadata": { "next_cursor": "" }
            }),
        )
        .unwrap();
        assert_eq!(page.channels[0].id, "C1");
        assert_eq!(ResponseMetadata::cursor(page.response_metadata), None);

        let page: MembersPage = decode_reply(
            "conversations.members",
            json!({
                "ok": true,
                "members": ["U1", "U2"],
                "response_metadata": { "next_cursor": "dXNlcjpVMDYxTkZUVDI=" }
            }),
        )
        .unwrap();
        assert_eq!(
            ResponseMetadata::cursor(page.response_metadata).as_deref(),
            Some("dXNlcjpVMDYxTkZUVDI=")
        );
    }
}
