//! Slack Web API client
//!
//! Wraps the handful of Slack calls the tool needs: resolving the team the
//! token belongs to, resolving user names to user IDs, opening direct-message
//! channels, and posting the invitation. Identity and user-name lookups go
//! through persistent caches so a repeat invocation makes no network calls
//! for names it has already resolved.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::cache::{CacheError, CacheStore};
use crate::config::Config;

/// Base URL for the Slack Web API
const SLACK_API_BASE_URL: &str = "https://slack.com/api";

/// Page size requested from `users.list`
const USERS_PAGE_LIMIT: &str = "200";

/// Errors that can occur when talking to Slack
#[derive(Debug, Error)]
pub enum SlackError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Slack answered with `ok: false`
    #[error("Slack API call {method} failed: {reason}")]
    Api {
        method: &'static str,
        reason: String,
    },

    /// A lookup cache could not be opened or written
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// No Slack user matches the requested name
    #[error("no Slack user named '{0}' could be found")]
    UnknownUser(String),
}

/// General information about the team a token authenticates to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamInfo {
    /// URL of the team's Slack workspace
    pub url: String,
    /// Team name
    pub team: String,
    /// Name of the bot user the token belongs to
    pub user: String,
    /// Team identifier
    pub team_id: String,
    /// Identifier of the bot user
    pub user_id: String,
}

/// A Slack client that can be used to invite users to a tmate session.
pub struct Client {
    api: Api,
    info: TeamInfo,
    /// User-name-to-ID lookups for this team, persisted across runs
    users: CacheStore,
}

impl Client {
    /// Connects a client for the configured token, caching under `cache_dir`.
    ///
    /// The team identity is resolved through a token-keyed store so repeat
    /// runs skip `auth.test` entirely; the identity then selects the
    /// per-team store used for user-name resolution.
    pub fn connect(config: &Config, cache_dir: &Path) -> Result<Client, SlackError> {
        let api = Api::new(config.token.clone());
        let mut teams = CacheStore::open(cache_dir.join("teams.json"))?;

        let api_ref = &api;
        let identity = teams
            .get_or_compute(&config.token, |_| {
                debug!("team identity not cached, calling auth.test");
                api_ref.team_identity().map(Some)
            })?
            .ok_or_else(|| SlackError::Api {
                method: "auth.test",
                reason: "no identity returned".to_string(),
            })?;
        let info: TeamInfo = serde_json::from_value(identity).map_err(CacheError::from)?;

        let users = CacheStore::open(cache_dir.join(format!("{}.json", info.team_id)))?;
        debug!(team = %info.team, user_cache = %users.location().display(), "connected");
        Ok(Client { api, info, users })
    }

    /// Returns general information about the team and the bot user.
    pub fn info(&self) -> &TeamInfo {
        &self.info
    }

    /// Resolves a user name to a user ID, consulting the per-team cache first.
    ///
    /// An unmatched name is not cached, so it will be looked up again on a
    /// later run (the user may have joined the team in the meantime).
    pub fn lookup_user_id(&mut self, name: &str) -> Result<Option<String>, SlackError> {
        let api = &self.api;
        let value = self.users.get_or_compute(name, |key| {
            debug!(user = key, "user ID not cached, paging through users.list");
            api.find_user_id(key).map(|id| id.map(Value::String))
        })?;
        Ok(value.and_then(|id| id.as_str().map(str::to_owned)))
    }

    /// Invites the named user by direct-messaging the connection string.
    pub fn invite(&mut self, name: &str, connection: &str) -> Result<(), SlackError> {
        let user_id = self
            .lookup_user_id(name)?
            .ok_or_else(|| SlackError::UnknownUser(name.to_string()))?;
        let channel = self.api.open_direct_message(&user_id)?;
        let text = format!(
            "{} has invited you to a tmate session. Connect with: `ssh {}`",
            self.info.user, connection
        );
        self.api.post_message(&channel, &text)?;
        Ok(())
    }
}

/// Thin transport over the Slack Web API
struct Api {
    http: reqwest::blocking::Client,
    token: String,
}

impl Api {
    fn new(token: String) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            token,
        }
    }

    /// POSTs a form-encoded API call and deserializes the JSON response.
    fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &'static str,
        params: &[(&str, &str)],
    ) -> Result<T, SlackError> {
        let url = format!("{SLACK_API_BASE_URL}/{method}");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .form(params)
            .send()?;
        Ok(response.json()?)
    }

    /// Resolves the team identity behind the token via `auth.test`.
    fn team_identity(&self) -> Result<Value, SlackError> {
        let response: AuthTestResponse = self.call("auth.test", &[])?;
        let info = identity_from(response)?;
        Ok(serde_json::to_value(info).map_err(CacheError::from)?)
    }

    /// Pages through `users.list` until a member matches `name`.
    fn find_user_id(&self, name: &str) -> Result<Option<String>, SlackError> {
        let mut cursor = String::new();
        loop {
            let mut params = vec![("limit", USERS_PAGE_LIMIT)];
            if !cursor.is_empty() {
                params.push(("cursor", cursor.as_str()));
            }
            let response: UsersListResponse = self.call("users.list", &params)?;
            ensure_ok("users.list", response.ok, response.error)?;

            for member in response.members.unwrap_or_default() {
                if member_matches(&member, name) {
                    return Ok(Some(member.id));
                }
            }

            cursor = response
                .response_metadata
                .and_then(|metadata| metadata.next_cursor)
                .unwrap_or_default();
            if cursor.is_empty() {
                return Ok(None);
            }
        }
    }

    /// Opens (or reuses) the direct-message channel to a user.
    fn open_direct_message(&self, user_id: &str) -> Result<String, SlackError> {
        let response: ConversationsOpenResponse =
            self.call("conversations.open", &[("users", user_id)])?;
        ensure_ok("conversations.open", response.ok, response.error)?;
        response
            .channel
            .map(|channel| channel.id)
            .ok_or_else(|| SlackError::Api {
                method: "conversations.open",
                reason: "no channel returned".to_string(),
            })
    }

    /// Posts a message into a channel.
    fn post_message(&self, channel: &str, text: &str) -> Result<(), SlackError> {
        let response: PostMessageResponse =
            self.call("chat.postMessage", &[("channel", channel), ("text", text)])?;
        ensure_ok("chat.postMessage", response.ok, response.error)
    }
}

/// Maps an `ok: false` answer to an error carrying Slack's reason.
fn ensure_ok(
    method: &'static str,
    ok: bool,
    error: Option<String>,
) -> Result<(), SlackError> {
    if ok {
        return Ok(());
    }
    Err(SlackError::Api {
        method,
        reason: error.unwrap_or_else(|| "unknown error".to_string()),
    })
}

/// Extracts the team identity fields out of an `auth.test` response.
fn identity_from(response: AuthTestResponse) -> Result<TeamInfo, SlackError> {
    ensure_ok("auth.test", response.ok, response.error)?;
    let missing = || SlackError::Api {
        method: "auth.test",
        reason: "response is missing identity fields".to_string(),
    };
    Ok(TeamInfo {
        url: response.url.ok_or_else(missing)?,
        team: response.team.ok_or_else(missing)?,
        user: response.user.ok_or_else(missing)?,
        team_id: response.team_id.ok_or_else(missing)?,
        user_id: response.user_id.ok_or_else(missing)?,
    })
}

/// Whether a member answers to `name` by username, display name, or real name.
fn member_matches(member: &Member, name: &str) -> bool {
    if member.deleted {
        return false;
    }
    if member.name == name {
        return true;
    }
    member
        .profile
        .as_ref()
        .map(|profile| {
            profile.display_name.as_deref() == Some(name)
                || profile.real_name.as_deref() == Some(name)
        })
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    ok: bool,
    error: Option<String>,
    url: Option<String>,
    team: Option<String>,
    user: Option<String>,
    team_id: Option<String>,
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsersListResponse {
    ok: bool,
    error: Option<String>,
    members: Option<Vec<Member>>,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct Member {
    id: String,
    name: String,
    #[serde(default)]
    deleted: bool,
    profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
struct Profile {
    display_name: Option<String>,
    real_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConversationsOpenResponse {
    ok: bool,
    error: Option<String>,
    channel: Option<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
}
