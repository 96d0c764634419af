use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use url::form_urlencoded;

/// The one account the mock accepts.
pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "secret";

pub const MAX_STATUS_CHARS: usize = 140;
const PAGE_SIZE: usize = 20;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub screen_name: String,
    pub profile_image_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Status {
    pub id: u64,
    pub text: String,
    pub created_at: String,
    pub user: User,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectMessage {
    pub id: u64,
    pub text: String,
    pub created_at: String,
    pub sender_screen_name: String,
    pub recipient_screen_name: String,
}

pub struct Store {
    users: Vec<User>,
    statuses: BTreeMap<u64, Status>,
    messages: Vec<DirectMessage>,
    following: BTreeSet<(String, String)>,
    next_id: u64,
}

impl Store {
    fn seeded() -> Self {
        let users = vec![
            user(1, "Alice", USERNAME),
            user(2, "Bob", "bob"),
        ];
        let mut store = Self {
            users,
            statuses: BTreeMap::new(),
            messages: Vec::new(),
            following: BTreeSet::new(),
            next_id: 100,
        };
        store
            .following
            .insert((USERNAME.to_string(), "bob".to_string()));
        store.post("bob", "hello from bob");
        store
    }

    fn user(&self, screen_name: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|u| u.screen_name.eq_ignore_ascii_case(screen_name) || u.id.to_string() == screen_name)
    }

    fn post(&mut self, screen_name: &str, text: &str) -> Option<Status> {
        let user = self.user(screen_name)?.clone();
        self.next_id += 1;
        let status = Status {
            id: self.next_id,
            text: text.to_string(),
            created_at: now(),
            user,
        };
        self.statuses.insert(status.id, status.clone());
        Some(status)
    }

    /// Newest first.
    fn timeline(&self) -> Vec<Status> {
        self.statuses.values().rev().cloned().collect()
    }
}

fn user(id: u64, name: &str, screen_name: &str) -> User {
    User {
        id,
        name: name.to_string(),
        screen_name: screen_name.to_string(),
        profile_image_url: format!("http://example.test/{screen_name}.png"),
    }
}

fn now() -> String {
    chrono::Utc::now().format("%a %b %d %H:%M:%S %z %Y").to_string()
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::seeded()));
    Router::new().fallback(dispatch).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Requested representation, taken from the path extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Json,
    Xml,
    Rss,
    Atom,
    Bare,
}

enum Payload {
    Statuses(Vec<Status>),
    Status(Status),
    Users(Vec<User>),
    User(User),
    Message(DirectMessage),
    Flag(bool),
    Text(&'static str),
}

fn split_format(path: &str) -> Option<(&str, Format)> {
    let last = path.rsplit('/').next().unwrap_or_default();
    let Some((_, ext)) = last.rsplit_once('.') else {
        return Some((path, Format::Bare));
    };
    let stem = &path[..path.len() - ext.len() - 1];
    let format = match ext {
        "json" => Format::Json,
        "xml" => Format::Xml,
        "rss" => Format::Rss,
        "atom" => Format::Atom,
        _ => return None,
    };
    Some((stem, format))
}

fn pairs(raw: &str) -> BTreeMap<String, String> {
    form_urlencoded::parse(raw.as_bytes()).into_owned().collect()
}

fn authorized(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let Some(token) = value.strip_prefix("Basic ") else {
        return false;
    };
    STANDARD
        .decode(token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .is_some_and(|pair| pair == format!("{USERNAME}:{PASSWORD}"))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"Microblog API\"")],
        "Could not authenticate you.",
    )
        .into_response()
}

fn failure(status: StatusCode, message: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain")], message).into_response()
}

async fn dispatch(
    State(db): State<Db>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let Some((stem, format)) = split_format(uri.path()) else {
        return failure(StatusCode::NOT_FOUND, "Not found");
    };
    let query = pairs(uri.query().unwrap_or_default());
    let form = pairs(&body);
    let segments: Vec<&str> = stem.trim_matches('/').split('/').collect();

    let public = matches!(
        (method.as_str(), segments.as_slice()),
        ("GET", ["statuses", "public_timeline"]) | ("GET", ["statuses", "featured"])
    );
    if !public && !authorized(&headers) {
        return unauthorized();
    }

    let result = match (method.as_str(), segments.as_slice()) {
        ("GET", ["statuses", "public_timeline"]) => {
            let since_id: u64 = query.get("since_id").and_then(|v| v.parse().ok()).unwrap_or(0);
            let store = db.read().await;
            Ok(Payload::Statuses(
                store.timeline().into_iter().filter(|s| s.id > since_id).collect(),
            ))
        }
        ("GET", ["statuses", "friends_timeline"]) => {
            let page: usize = query.get("page").and_then(|v| v.parse().ok()).unwrap_or(1);
            let store = db.read().await;
            Ok(Payload::Statuses(
                store
                    .timeline()
                    .into_iter()
                    .skip(page.saturating_sub(1) * PAGE_SIZE)
                    .take(PAGE_SIZE)
                    .collect(),
            ))
        }
        ("GET", ["statuses", "user_timeline"]) => {
            let count: usize = query.get("count").and_then(|v| v.parse().ok()).unwrap_or(PAGE_SIZE);
            let store = db.read().await;
            Ok(Payload::Statuses(
                store
                    .timeline()
                    .into_iter()
                    .filter(|s| s.user.screen_name == USERNAME)
                    .take(count)
                    .collect(),
            ))
        }
        ("GET", ["statuses", "show", id]) => {
            let store = db.read().await;
            id.parse::<u64>()
                .ok()
                .and_then(|id| store.statuses.get(&id).cloned())
                .map(Payload::Status)
                .ok_or((StatusCode::NOT_FOUND, "No status found with that ID."))
        }
        ("POST", ["statuses", "update"]) => match form.get("status") {
            None => Err((StatusCode::BAD_REQUEST, "Status is required.")),
            Some(text) if text.chars().count() > MAX_STATUS_CHARS => {
                Err((StatusCode::FORBIDDEN, "Status is over 140 characters."))
            }
            Some(text) => {
                let mut store = db.write().await;
                store
                    .post(USERNAME, text)
                    .map(Payload::Status)
                    .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "Unknown account."))
            }
        },
        ("POST", ["statuses", "destroy", id]) => {
            let mut store = db.write().await;
            id.parse::<u64>()
                .ok()
                .and_then(|id| store.statuses.remove(&id))
                .map(Payload::Status)
                .ok_or((StatusCode::NOT_FOUND, "No status found with that ID."))
        }
        ("GET", ["statuses", "featured"]) => {
            let store = db.read().await;
            Ok(Payload::Users(store.users.clone()))
        }
        ("GET", ["users", "show", name]) => {
            let name = urlencoding::decode(name).map(|n| n.into_owned()).unwrap_or_default();
            let store = db.read().await;
            store
                .user(&name)
                .cloned()
                .map(Payload::User)
                .ok_or((StatusCode::NOT_FOUND, "Not found"))
        }
        ("POST", ["direct_messages", "new"]) => {
            match (form.get("user"), form.get("text")) {
                (Some(recipient), Some(text)) => {
                    let mut store = db.write().await;
                    match store.user(recipient).map(|u| u.screen_name.clone()) {
                        None => Err((StatusCode::FORBIDDEN, "There is no user with that screen name.")),
                        Some(recipient) => {
                            store.next_id += 1;
                            let message = DirectMessage {
                                id: store.next_id,
                                text: text.clone(),
                                created_at: now(),
                                sender_screen_name: USERNAME.to_string(),
                                recipient_screen_name: recipient,
                            };
                            store.messages.push(message.clone());
                            Ok(Payload::Message(message))
                        }
                    }
                }
                _ => Err((StatusCode::BAD_REQUEST, "user and text are required.")),
            }
        }
        ("GET", ["friendships", "exists"]) => match (query.get("user_a"), query.get("user_b")) {
            (Some(a), Some(b)) => {
                let store = db.read().await;
                Ok(Payload::Flag(store.following.contains(&(a.clone(), b.clone()))))
            }
            _ => Err((StatusCode::BAD_REQUEST, "user_a and user_b are required.")),
        },
        ("GET", ["account", "verify_credentials"]) => {
            if format == Format::Bare {
                Ok(Payload::Text("Authorized"))
            } else {
                let store = db.read().await;
                store
                    .user(USERNAME)
                    .cloned()
                    .map(Payload::User)
                    .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "Unknown account."))
            }
        }
        ("GET", ["account", "end_session"]) => Ok(Payload::Text("Logged out.")),
        ("GET", ["help", "test"]) => Ok(Payload::Flag(true)),
        _ => Err((StatusCode::NOT_FOUND, "Not found")),
    };

    match result {
        Ok(payload) => render(format, payload),
        Err((status, message)) => failure(status, message),
    }
}

fn render(format: Format, payload: Payload) -> Response {
    let content_type = match format {
        Format::Json => "application/json",
        Format::Xml => "application/xml",
        Format::Rss => "application/rss+xml",
        Format::Atom => "application/atom+xml",
        Format::Bare => "text/plain",
    };
    let body = match format {
        Format::Json | Format::Bare => to_json(&payload),
        Format::Xml => to_xml(&payload),
        Format::Rss => wrap_feed(
            "<rss version=\"2.0\"><channel><title>Microblog</title>",
            "</channel></rss>",
            "item",
            &payload,
        ),
        Format::Atom => wrap_feed(
            "<feed xmlns=\"http://www.w3.org/2005/Atom\"><title>Microblog</title>",
            "</feed>",
            "entry",
            &payload,
        ),
    };
    (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
}

fn to_json(payload: &Payload) -> String {
    let value = match payload {
        Payload::Statuses(statuses) => serde_json::to_value(statuses),
        Payload::Status(status) => serde_json::to_value(status),
        Payload::Users(users) => serde_json::to_value(users),
        Payload::User(user) => serde_json::to_value(user),
        Payload::Message(message) => serde_json::to_value(message),
        Payload::Flag(flag) => return flag.to_string(),
        Payload::Text(text) => return (*text).to_string(),
    };
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn user_xml(user: &User) -> String {
    format!(
        "<user><id>{}</id><name>{}</name><screen_name>{}</screen_name><profile_image_url>{}</profile_image_url></user>",
        user.id,
        escape(&user.name),
        escape(&user.screen_name),
        escape(&user.profile_image_url)
    )
}

fn status_xml(status: &Status) -> String {
    format!(
        "<status><created_at>{}</created_at><id>{}</id><text>{}</text>{}</status>",
        escape(&status.created_at),
        status.id,
        escape(&status.text),
        user_xml(&status.user)
    )
}

fn to_xml(payload: &Payload) -> String {
    match payload {
        Payload::Statuses(statuses) => format!(
            "<statuses type=\"array\">{}</statuses>",
            statuses.iter().map(status_xml).collect::<String>()
        ),
        Payload::Status(status) => status_xml(status),
        Payload::Users(users) => format!(
            "<users type=\"array\">{}</users>",
            users.iter().map(user_xml).collect::<String>()
        ),
        Payload::User(user) => user_xml(user),
        Payload::Message(message) => format!(
            "<direct_message><id>{}</id><text>{}</text><sender_screen_name>{}</sender_screen_name><recipient_screen_name>{}</recipient_screen_name><created_at>{}</created_at></direct_message>",
            message.id,
            escape(&message.text),
            escape(&message.sender_screen_name),
            escape(&message.recipient_screen_name),
            escape(&message.created_at)
        ),
        Payload::Flag(flag) => format!("<friends>{flag}</friends>"),
        Payload::Text(text) => format!("<message>{}</message>", escape(text)),
    }
}

fn wrap_feed(open: &str, close: &str, tag: &str, payload: &Payload) -> String {
    let entries = match payload {
        Payload::Statuses(statuses) => statuses
            .iter()
            .map(|s| {
                format!(
                    "<{tag}><title>{}: {}</title><id>{}</id></{tag}>",
                    escape(&s.user.screen_name),
                    escape(&s.text),
                    s.id
                )
            })
            .collect::<String>(),
        other => to_xml(other),
    };
    format!("{open}{entries}{close}")
}
