//! The read-only table of remote operations.
//!
//! # Design
//! Every operation is described by one `OperationDescriptor`: path, allowed
//! formats, positional path argument, declared parameters (in the order they
//! are validated and encoded), auth requirement, and HTTP method. The table
//! is a `static` so it is built once and never mutated; the request builder
//! is driven entirely by it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::http::HttpMethod;
use crate::types::Format;
use crate::validate::{MAX_COUNT, MAX_TEXT_CHARS};

const FEED: &[Format] = &[Format::Json, Format::Xml, Format::Rss, Format::Atom];
const ENTITY: &[Format] = &[Format::Json, Format::Xml];
const PROBE: &[Format] = &[Format::Json, Format::Xml, Format::None];
const SESSION: &[Format] = &[Format::None];

const DEVICES: &[&str] = &["sms", "im", "none"];

/// Positional identifier interpolated into the path after the base path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathArg {
    None,
    /// Numeric status/message ID.
    Id,
    /// User ID or screen name, percent-encoded.
    Name,
}

/// Validation and encoding rule for one declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Non-negative integer (`since_id`, `page`).
    Integer,
    /// Non-negative integer with an upper bound.
    Count { max: u64 },
    /// Date string, re-rendered in the service's layout.
    Date,
    /// Sent as `true` when set, omitted otherwise.
    Flag,
    /// Free text, optionally length-limited.
    Text { max_chars: Option<usize> },
    /// Case-insensitive member of a fixed set.
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

const fn optional(name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: false,
    }
}

const fn required(name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: true,
    }
}

const SINCE: ParamSpec = optional("since", ParamKind::Date);
const SINCE_ID: ParamSpec = optional("since_id", ParamKind::Integer);
const PAGE: ParamSpec = optional("page", ParamKind::Integer);
const COUNT: ParamSpec = optional("count", ParamKind::Count { max: MAX_COUNT });
const LITE: ParamSpec = optional("lite", ParamKind::Flag);
const LIMITED_TEXT: ParamKind = ParamKind::Text {
    max_chars: Some(MAX_TEXT_CHARS),
};
const PLAIN_TEXT: ParamKind = ParamKind::Text { max_chars: None };
const STATUS: ParamSpec = required("status", LIMITED_TEXT);
const RECIPIENT: ParamSpec = required("user", PLAIN_TEXT);
const MESSAGE_TEXT: ParamSpec = required("text", LIMITED_TEXT);
const USER_A: ParamSpec = required("user_a", PLAIN_TEXT);
const USER_B: ParamSpec = required("user_b", PLAIN_TEXT);
const LOCATION: ParamSpec = required("location", PLAIN_TEXT);
const DEVICE: ParamSpec = required("device", ParamKind::Choice(DEVICES));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub operation: Operation,
    pub path: &'static str,
    pub formats: &'static [Format],
    pub path_arg: PathArg,
    pub params: &'static [ParamSpec],
    pub requires_auth: bool,
    pub method: HttpMethod,
}

impl OperationDescriptor {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|spec| spec.name == name)
    }

    /// Format used when the caller does not ask for one.
    pub fn default_format(&self) -> Format {
        if self.formats.contains(&Format::Json) {
            Format::Json
        } else {
            Format::None
        }
    }
}

/// Every remote call the client exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    PublicTimeline,
    FriendsTimeline,
    UserTimeline,
    ShowStatus,
    UpdateStatus,
    Replies,
    DestroyStatus,
    Friends,
    Followers,
    Featured,
    ShowUser,
    DirectMessages,
    SentDirectMessages,
    SendDirectMessage,
    DestroyDirectMessage,
    CreateFriendship,
    DestroyFriendship,
    FriendshipExists,
    VerifyCredentials,
    EndSession,
    Archive,
    UpdateLocation,
    UpdateDeliveryDevice,
    Favorites,
    CreateFavorite,
    DestroyFavorite,
    Follow,
    Leave,
    Block,
    Unblock,
    HelpTest,
    DowntimeSchedule,
}

impl Operation {
    pub const ALL: [Operation; 32] = [
        Operation::PublicTimeline,
        Operation::FriendsTimeline,
        Operation::UserTimeline,
        Operation::ShowStatus,
        Operation::UpdateStatus,
        Operation::Replies,
        Operation::DestroyStatus,
        Operation::Friends,
        Operation::Followers,
        Operation::Featured,
        Operation::ShowUser,
        Operation::DirectMessages,
        Operation::SentDirectMessages,
        Operation::SendDirectMessage,
        Operation::DestroyDirectMessage,
        Operation::CreateFriendship,
        Operation::DestroyFriendship,
        Operation::FriendshipExists,
        Operation::VerifyCredentials,
        Operation::EndSession,
        Operation::Archive,
        Operation::UpdateLocation,
        Operation::UpdateDeliveryDevice,
        Operation::Favorites,
        Operation::CreateFavorite,
        Operation::DestroyFavorite,
        Operation::Follow,
        Operation::Leave,
        Operation::Block,
        Operation::Unblock,
        Operation::HelpTest,
        Operation::DowntimeSchedule,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Operation::PublicTimeline => "public_timeline",
            Operation::FriendsTimeline => "friends_timeline",
            Operation::UserTimeline => "user_timeline",
            Operation::ShowStatus => "show_status",
            Operation::UpdateStatus => "update_status",
            Operation::Replies => "replies",
            Operation::DestroyStatus => "destroy_status",
            Operation::Friends => "friends",
            Operation::Followers => "followers",
            Operation::Featured => "featured",
            Operation::ShowUser => "show_user",
            Operation::DirectMessages => "direct_messages",
            Operation::SentDirectMessages => "sent_direct_messages",
            Operation::SendDirectMessage => "send_direct_message",
            Operation::DestroyDirectMessage => "destroy_direct_message",
            Operation::CreateFriendship => "create_friendship",
            Operation::DestroyFriendship => "destroy_friendship",
            Operation::FriendshipExists => "friendship_exists",
            Operation::VerifyCredentials => "verify_credentials",
            Operation::EndSession => "end_session",
            Operation::Archive => "archive",
            Operation::UpdateLocation => "update_location",
            Operation::UpdateDeliveryDevice => "update_delivery_device",
            Operation::Favorites => "favorites",
            Operation::CreateFavorite => "create_favorite",
            Operation::DestroyFavorite => "destroy_favorite",
            Operation::Follow => "follow",
            Operation::Leave => "leave",
            Operation::Block => "block",
            Operation::Unblock => "unblock",
            Operation::HelpTest => "help_test",
            Operation::DowntimeSchedule => "downtime_schedule",
        }
    }

    /// The table entry for this operation.
    pub fn descriptor(self) -> &'static OperationDescriptor {
        // CATALOG is ordered like `Operation::ALL`; a unit test pins that.
        &CATALOG[self as usize]
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| format!("unknown operation: {s}"))
    }
}

const fn get(
    operation: Operation,
    path: &'static str,
    formats: &'static [Format],
    path_arg: PathArg,
    params: &'static [ParamSpec],
) -> OperationDescriptor {
    OperationDescriptor {
        operation,
        path,
        formats,
        path_arg,
        params,
        requires_auth: true,
        method: HttpMethod::Get,
    }
}

const fn post(
    operation: Operation,
    path: &'static str,
    path_arg: PathArg,
    params: &'static [ParamSpec],
) -> OperationDescriptor {
    OperationDescriptor {
        operation,
        path,
        formats: ENTITY,
        path_arg,
        params,
        requires_auth: true,
        method: HttpMethod::Post,
    }
}

const fn anonymous(descriptor: OperationDescriptor) -> OperationDescriptor {
    OperationDescriptor {
        requires_auth: false,
        ..descriptor
    }
}

static CATALOG: [OperationDescriptor; 32] = [
    anonymous(get(
        Operation::PublicTimeline,
        "/statuses/public_timeline",
        FEED,
        PathArg::None,
        &[SINCE_ID],
    )),
    get(
        Operation::FriendsTimeline,
        "/statuses/friends_timeline",
        FEED,
        PathArg::None,
        &[SINCE, PAGE],
    ),
    get(
        Operation::UserTimeline,
        "/statuses/user_timeline",
        FEED,
        PathArg::None,
        &[SINCE, COUNT, PAGE],
    ),
    get(Operation::ShowStatus, "/statuses/show", ENTITY, PathArg::Id, &[]),
    post(
        Operation::UpdateStatus,
        "/statuses/update",
        PathArg::None,
        &[STATUS],
    ),
    get(Operation::Replies, "/statuses/replies", FEED, PathArg::None, &[PAGE]),
    post(Operation::DestroyStatus, "/statuses/destroy", PathArg::Id, &[]),
    get(
        Operation::Friends,
        "/statuses/friends",
        ENTITY,
        PathArg::None,
        &[PAGE, LITE],
    ),
    get(
        Operation::Followers,
        "/statuses/followers",
        ENTITY,
        PathArg::None,
        &[PAGE, LITE],
    ),
    anonymous(get(
        Operation::Featured,
        "/statuses/featured",
        ENTITY,
        PathArg::None,
        &[],
    )),
    get(Operation::ShowUser, "/users/show", ENTITY, PathArg::Name, &[]),
    get(
        Operation::DirectMessages,
        "/direct_messages",
        FEED,
        PathArg::None,
        &[SINCE, SINCE_ID, PAGE],
    ),
    get(
        Operation::SentDirectMessages,
        "/direct_messages/sent",
        ENTITY,
        PathArg::None,
        &[SINCE, SINCE_ID, PAGE],
    ),
    post(
        Operation::SendDirectMessage,
        "/direct_messages/new",
        PathArg::None,
        &[RECIPIENT, MESSAGE_TEXT],
    ),
    post(
        Operation::DestroyDirectMessage,
        "/direct_messages/destroy",
        PathArg::Id,
        &[],
    ),
    post(
        Operation::CreateFriendship,
        "/friendships/create",
        PathArg::Name,
        &[],
    ),
    post(
        Operation::DestroyFriendship,
        "/friendships/destroy",
        PathArg::Name,
        &[],
    ),
    get(
        Operation::FriendshipExists,
        "/friendships/exists",
        PROBE,
        PathArg::None,
        &[USER_A, USER_B],
    ),
    get(
        Operation::VerifyCredentials,
        "/account/verify_credentials",
        PROBE,
        PathArg::None,
        &[],
    ),
    get(
        Operation::EndSession,
        "/account/end_session",
        SESSION,
        PathArg::None,
        &[],
    ),
    get(
        Operation::Archive,
        "/account/archive",
        ENTITY,
        PathArg::None,
        &[SINCE, SINCE_ID, PAGE],
    ),
    post(
        Operation::UpdateLocation,
        "/account/update_location",
        PathArg::None,
        &[LOCATION],
    ),
    post(
        Operation::UpdateDeliveryDevice,
        "/account/update_delivery_device",
        PathArg::None,
        &[DEVICE],
    ),
    get(Operation::Favorites, "/favorites", FEED, PathArg::None, &[PAGE]),
    post(Operation::CreateFavorite, "/favorites/create", PathArg::Id, &[]),
    post(Operation::DestroyFavorite, "/favorites/destroy", PathArg::Id, &[]),
    get(
        Operation::Follow,
        "/notifications/follow",
        ENTITY,
        PathArg::Name,
        &[],
    ),
    get(
        Operation::Leave,
        "/notifications/leave",
        ENTITY,
        PathArg::Name,
        &[],
    ),
    post(Operation::Block, "/blocks/create", PathArg::Name, &[]),
    post(Operation::Unblock, "/blocks/destroy", PathArg::Name, &[]),
    get(Operation::HelpTest, "/help/test", ENTITY, PathArg::None, &[]),
    get(
        Operation::DowntimeSchedule,
        "/help/downtime_schedule",
        ENTITY,
        PathArg::None,
        &[],
    ),
];
