//! The client façade: one method per remote operation.
//!
//! # Design
//! `MicroblogClient` holds the Basic credentials and last-call bookkeeping.
//! Every typed method only packs its arguments into `RequestArgs` and calls
//! `execute`, which runs validation and request building from the catalog,
//! hands the request to the `Transport`, and wraps the result. Methods take
//! `&mut self` because each call updates `last_request_time` and
//! `last_response`; callers needing concurrency use separate instances.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::catalog::Operation;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::request::{build_request, RequestArgs};
use crate::response::Response;
use crate::transport::{Transport, UreqTransport};
use crate::types::Credentials;

/// Blocking client for the micro-blogging REST API.
pub struct MicroblogClient<T = UreqTransport> {
    base_url: String,
    transport: T,
    credentials: Option<Credentials>,
    last_request_time: Option<DateTime<Utc>>,
    last_response: Option<Response>,
}

impl MicroblogClient<UreqTransport> {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_transport(config.base_url(), UreqTransport::new(config))
    }
}

impl<T: Transport> MicroblogClient<T> {
    pub fn with_transport(base_url: &str, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            credentials: None,
            last_request_time: None,
            last_response: None,
        }
    }

    /// Builder-style variant of [`set_auth`](Self::set_auth).
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.set_auth(username, password);
        self
    }

    /// Replaces the credentials used for authenticated operations.
    pub fn set_auth(&mut self, username: &str, password: &str) -> &mut Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    pub fn clear_auth(&mut self) -> &mut Self {
        self.credentials = None;
        self
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// When the most recent request was handed to the transport.
    pub fn last_request_time(&self) -> Option<DateTime<Utc>> {
        self.last_request_time
    }

    /// The response of the most recent completed call.
    pub fn last_response(&self) -> Option<&Response> {
        self.last_response.as_ref()
    }

    /// Runs `operation` with `args`.
    ///
    /// Validation failures return before any network activity. HTTP error
    /// statuses come back as an ordinary `Response`; only a failure to
    /// complete the exchange is an `Err(ClientError::Transport)`, and in that
    /// case `last_response` is left untouched.
    pub fn execute(&mut self, operation: Operation, args: &RequestArgs) -> Result<Response, ClientError> {
        let request = build_request(&self.base_url, operation.descriptor(), args)?;

        let credentials = if request.use_auth {
            if self.credentials.is_none() {
                warn!(%operation, "authenticated operation dispatched without credentials");
            }
            self.credentials.as_ref()
        } else {
            None
        };

        self.last_request_time = Some(Utc::now());
        debug!(
            %operation,
            method = request.method.as_str(),
            url = %request.url,
            auth = credentials.is_some(),
            "dispatching request"
        );

        let raw = self.transport.execute(&request, credentials)?;
        debug!(
            %operation,
            status = raw.metadata.http_code,
            elapsed_ms = raw.metadata.total_time_ms,
            format = %request.format,
            "response received"
        );

        let response = Response::new(raw.body, raw.metadata, request.format);
        self.last_response = Some(response.clone());
        Ok(response)
    }

    // -----------------------------------------------------------------------
    // Statuses
    // -----------------------------------------------------------------------

    /// The public timeline. Does not send credentials.
    pub fn public_timeline(&mut self, format: &str, since_id: Option<u64>) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).optional("since_id", since_id);
        self.execute(Operation::PublicTimeline, &args)
    }

    /// Statuses from the authenticated user and the users they follow.
    /// `since` accepts any date string the validator understands.
    pub fn friends_timeline(
        &mut self,
        format: &str,
        since: Option<&str>,
        page: Option<u64>,
    ) -> Result<Response, ClientError> {
        let args = RequestArgs::new()
            .format(format)
            .optional("since", since)
            .optional("page", page);
        self.execute(Operation::FriendsTimeline, &args)
    }

    /// The authenticated user's own statuses. `count` may not exceed 20.
    pub fn user_timeline(
        &mut self,
        format: &str,
        since: Option<&str>,
        count: Option<u64>,
        page: Option<u64>,
    ) -> Result<Response, ClientError> {
        let args = RequestArgs::new()
            .format(format)
            .optional("since", since)
            .optional("count", count)
            .optional("page", page);
        self.execute(Operation::UserTimeline, &args)
    }

    pub fn show_status(&mut self, id: u64, format: &str) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).id(id);
        self.execute(Operation::ShowStatus, &args)
    }

    /// Posts a new status. Text longer than 140 characters is rejected
    /// locally.
    pub fn update_status(&mut self, status: &str, format: &str) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).param("status", status);
        self.execute(Operation::UpdateStatus, &args)
    }

    pub fn replies(&mut self, format: &str, page: Option<u64>) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).optional("page", page);
        self.execute(Operation::Replies, &args)
    }

    pub fn destroy_status(&mut self, id: u64, format: &str) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).id(id);
        self.execute(Operation::DestroyStatus, &args)
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// Users the authenticated user follows. `lite` omits embedded statuses.
    pub fn friends(&mut self, format: &str, page: Option<u64>, lite: bool) -> Result<Response, ClientError> {
        let args = RequestArgs::new()
            .format(format)
            .optional("page", page)
            .param("lite", lite);
        self.execute(Operation::Friends, &args)
    }

    pub fn followers(&mut self, format: &str, page: Option<u64>, lite: bool) -> Result<Response, ClientError> {
        let args = RequestArgs::new()
            .format(format)
            .optional("page", page)
            .param("lite", lite);
        self.execute(Operation::Followers, &args)
    }

    /// Featured users. Does not send credentials.
    pub fn featured(&mut self, format: &str) -> Result<Response, ClientError> {
        self.execute(Operation::Featured, &RequestArgs::new().format(format))
    }

    /// Profile of `user` (ID or screen name).
    pub fn show_user(&mut self, user: &str, format: &str) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).name(user);
        self.execute(Operation::ShowUser, &args)
    }

    // -----------------------------------------------------------------------
    // Direct messages
    // -----------------------------------------------------------------------

    pub fn direct_messages(
        &mut self,
        format: &str,
        since: Option<&str>,
        since_id: Option<u64>,
        page: Option<u64>,
    ) -> Result<Response, ClientError> {
        let args = RequestArgs::new()
            .format(format)
            .optional("since", since)
            .optional("since_id", since_id)
            .optional("page", page);
        self.execute(Operation::DirectMessages, &args)
    }

    pub fn sent_direct_messages(
        &mut self,
        format: &str,
        since: Option<&str>,
        since_id: Option<u64>,
        page: Option<u64>,
    ) -> Result<Response, ClientError> {
        let args = RequestArgs::new()
            .format(format)
            .optional("since", since)
            .optional("since_id", since_id)
            .optional("page", page);
        self.execute(Operation::SentDirectMessages, &args)
    }

    /// Sends `text` to `user`. Text longer than 140 characters is rejected
    /// locally.
    pub fn send_direct_message(&mut self, user: &str, text: &str, format: &str) -> Result<Response, ClientError> {
        let args = RequestArgs::new()
            .format(format)
            .param("user", user)
            .param("text", text);
        self.execute(Operation::SendDirectMessage, &args)
    }

    pub fn destroy_direct_message(&mut self, id: u64, format: &str) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).id(id);
        self.execute(Operation::DestroyDirectMessage, &args)
    }

    // -----------------------------------------------------------------------
    // Friendships
    // -----------------------------------------------------------------------

    pub fn create_friendship(&mut self, user: &str, format: &str) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).name(user);
        self.execute(Operation::CreateFriendship, &args)
    }

    pub fn destroy_friendship(&mut self, user: &str, format: &str) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).name(user);
        self.execute(Operation::DestroyFriendship, &args)
    }

    /// Whether `user_a` follows `user_b`. With format `none` the body is the
    /// bare `true`/`false`.
    pub fn friendship_exists(&mut self, user_a: &str, user_b: &str, format: &str) -> Result<Response, ClientError> {
        let args = RequestArgs::new()
            .format(format)
            .param("user_a", user_a)
            .param("user_b", user_b);
        self.execute(Operation::FriendshipExists, &args)
    }

    // -----------------------------------------------------------------------
    // Account
    // -----------------------------------------------------------------------

    /// Checks the configured credentials. With format `none` only the status
    /// code is meaningful.
    pub fn verify_credentials(&mut self, format: &str) -> Result<Response, ClientError> {
        self.execute(Operation::VerifyCredentials, &RequestArgs::new().format(format))
    }

    /// Ends the authenticated session. Always format `none`.
    pub fn end_session(&mut self) -> Result<Response, ClientError> {
        self.execute(Operation::EndSession, &RequestArgs::new())
    }

    pub fn archive(
        &mut self,
        format: &str,
        since: Option<&str>,
        since_id: Option<u64>,
        page: Option<u64>,
    ) -> Result<Response, ClientError> {
        let args = RequestArgs::new()
            .format(format)
            .optional("since", since)
            .optional("since_id", since_id)
            .optional("page", page);
        self.execute(Operation::Archive, &args)
    }

    pub fn update_location(&mut self, location: &str, format: &str) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).param("location", location);
        self.execute(Operation::UpdateLocation, &args)
    }

    /// `device` is one of `sms`, `im`, `none` (any case).
    pub fn update_delivery_device(&mut self, device: &str, format: &str) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).param("device", device);
        self.execute(Operation::UpdateDeliveryDevice, &args)
    }

    // -----------------------------------------------------------------------
    // Favorites
    // -----------------------------------------------------------------------

    pub fn favorites(&mut self, format: &str, page: Option<u64>) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).optional("page", page);
        self.execute(Operation::Favorites, &args)
    }

    pub fn create_favorite(&mut self, id: u64, format: &str) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).id(id);
        self.execute(Operation::CreateFavorite, &args)
    }

    pub fn destroy_favorite(&mut self, id: u64, format: &str) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).id(id);
        self.execute(Operation::DestroyFavorite, &args)
    }

    // -----------------------------------------------------------------------
    // Notifications and blocks
    // -----------------------------------------------------------------------

    pub fn follow(&mut self, user: &str, format: &str) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).name(user);
        self.execute(Operation::Follow, &args)
    }

    pub fn leave(&mut self, user: &str, format: &str) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).name(user);
        self.execute(Operation::Leave, &args)
    }

    pub fn block(&mut self, user: &str, format: &str) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).name(user);
        self.execute(Operation::Block, &args)
    }

    pub fn unblock(&mut self, user: &str, format: &str) -> Result<Response, ClientError> {
        let args = RequestArgs::new().format(format).name(user);
        self.execute(Operation::Unblock, &args)
    }

    // -----------------------------------------------------------------------
    // Help
    // -----------------------------------------------------------------------

    pub fn help_test(&mut self, format: &str) -> Result<Response, ClientError> {
        self.execute(Operation::HelpTest, &RequestArgs::new().format(format))
    }

    pub fn downtime_schedule(&mut self, format: &str) -> Result<Response, ClientError> {
        self.execute(Operation::DowntimeSchedule, &RequestArgs::new().format(format))
    }
}

impl<T> fmt::Debug for MicroblogClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicroblogClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("last_request_time", &self.last_request_time)
            .field("last_response", &self.last_response)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use tracing_test::traced_test;

    use super::*;
    use crate::error::TransportError;
    use crate::http::{HttpMethod, HttpRequest, ResponseMetadata, TransportResponse};
    use crate::types::Format;

    /// Records every request and answers with a fixed status.
    struct Recorder {
        status: u16,
        fail: Cell<bool>,
        requests: RefCell<Vec<(HttpRequest, Option<Credentials>)>>,
        calls: Cell<usize>,
    }

    impl Recorder {
        fn answering(status: u16) -> Self {
            Self {
                status,
                fail: Cell::new(false),
                requests: RefCell::new(Vec::new()),
                calls: Cell::new(0),
            }
        }

        fn last(&self) -> (HttpRequest, Option<Credentials>) {
            self.requests.borrow().last().cloned().unwrap()
        }
    }

    impl Transport for Recorder {
        fn execute(
            &self,
            request: &HttpRequest,
            credentials: Option<&Credentials>,
        ) -> Result<TransportResponse, TransportError> {
            self.calls.set(self.calls.get() + 1);
            self.requests
                .borrow_mut()
                .push((request.clone(), credentials.cloned()));
            if self.fail.get() {
                return Err(TransportError::new(&request.url, "connection refused"));
            }
            Ok(TransportResponse {
                body: b"recorded".to_vec(),
                metadata: ResponseMetadata::with_status(self.status),
            })
        }
    }

    fn client(recorder: &Recorder) -> MicroblogClient<&Recorder> {
        MicroblogClient::with_transport("http://localhost:3000", recorder).with_auth("alice", "secret")
    }

    #[test]
    fn show_status_issues_authenticated_get() {
        let recorder = Recorder::answering(200);
        let response = client(&recorder).show_status(12345, "xml").unwrap();

        let (req, creds) = recorder.last();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/statuses/show/12345.xml");
        assert_eq!(creds.unwrap().username, "alice");
        assert!(response.is_xml());
        assert_eq!(response.text().unwrap(), "recorded");
    }

    #[test]
    fn overlong_status_never_reaches_transport() {
        let recorder = Recorder::answering(200);
        let mut c = client(&recorder);
        for format in ["json", "xml", "yaml"] {
            let err = c.update_status(&"x".repeat(141), format).unwrap_err();
            assert!(err.as_validation().is_some());
        }
        assert_eq!(recorder.calls.get(), 0);
        assert!(c.last_request_time().is_none());
        assert!(c.last_response().is_none());
    }

    #[test]
    fn status_at_limit_is_posted() {
        let recorder = Recorder::answering(200);
        client(&recorder).update_status(&"x".repeat(140), "json").unwrap();
        let (req, _) = recorder.last();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.body.unwrap(), format!("status={}", "x".repeat(140)));
    }

    #[test]
    fn bad_since_fails_validation() {
        let recorder = Recorder::answering(200);
        let err = client(&recorder)
            .friends_timeline("json", Some("not-a-date"), None)
            .unwrap_err();
        assert_eq!(err.as_validation().unwrap().parameter, "since");
        assert_eq!(recorder.calls.get(), 0);
    }

    #[test]
    fn count_over_maximum_fails_validation() {
        let recorder = Recorder::answering(200);
        let err = client(&recorder)
            .user_timeline("json", None, Some(21), None)
            .unwrap_err();
        assert_eq!(err.as_validation().unwrap().parameter, "count");
        assert_eq!(recorder.calls.get(), 0);
    }

    #[test]
    fn verify_credentials_none_has_no_suffix() {
        let recorder = Recorder::answering(200);
        let response = client(&recorder).verify_credentials("none").unwrap();
        let (req, creds) = recorder.last();
        assert_eq!(req.url, "http://localhost:3000/account/verify_credentials");
        assert!(creds.is_some());
        assert_eq!(response.format(), Format::None);
    }

    #[test]
    fn public_timeline_and_featured_send_no_credentials() {
        let recorder = Recorder::answering(200);
        let mut c = client(&recorder);
        c.public_timeline("rss", Some(10)).unwrap();
        let (req, creds) = recorder.last();
        assert_eq!(req.url, "http://localhost:3000/statuses/public_timeline.rss?since_id=10");
        assert!(creds.is_none());

        c.featured("xml").unwrap();
        assert!(recorder.last().1.is_none());
    }

    #[test]
    fn http_errors_are_returned_and_recorded() {
        let recorder = Recorder::answering(401);
        let mut c = client(&recorder);
        let response = c.help_test("json").unwrap();
        assert!(response.is_error());
        assert_eq!(c.last_response(), Some(&response));
        assert!(c.last_request_time().is_some());
    }

    #[test]
    fn transport_failure_propagates_and_keeps_previous_response() {
        let recorder = Recorder::answering(200);
        let mut c = client(&recorder);
        let first = c.help_test("json").unwrap();
        let first_time = c.last_request_time().unwrap();

        recorder.fail.set(true);
        let err = c.downtime_schedule("json").unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(c.last_response(), Some(&first));
        assert!(c.last_request_time().unwrap() >= first_time);
        assert_eq!(recorder.calls.get(), 2);
    }

    #[test]
    fn set_auth_replaces_credentials() {
        let recorder = Recorder::answering(200);
        let mut c = client(&recorder);
        c.set_auth("bob", "pw").set_auth("carol", "pw2");
        c.end_session().unwrap();
        let (req, creds) = recorder.last();
        assert_eq!(req.url, "http://localhost:3000/account/end_session");
        assert_eq!(creds.unwrap().username, "carol");

        c.clear_auth();
        c.end_session().unwrap();
        assert!(recorder.last().1.is_none());
    }

    #[test]
    fn send_direct_message_encodes_body_in_order() {
        let recorder = Recorder::answering(200);
        client(&recorder)
            .send_direct_message("bob smith", "lunch? 12:30", "xml")
            .unwrap();
        let (req, _) = recorder.last();
        assert_eq!(req.url, "http://localhost:3000/direct_messages/new.xml");
        assert_eq!(req.body.as_deref(), Some("user=bob+smith&text=lunch%3F+12%3A30"));
    }

    #[test]
    fn friends_lite_flag() {
        let recorder = Recorder::answering(200);
        let mut c = client(&recorder);
        c.friends("json", None, false).unwrap();
        assert_eq!(recorder.last().0.url, "http://localhost:3000/statuses/friends.json");
        c.followers("json", Some(0), true).unwrap();
        assert_eq!(
            recorder.last().0.url,
            "http://localhost:3000/statuses/followers.json?page=0&lite=true"
        );
    }

    #[test]
    fn every_typed_method_hits_its_catalog_path() {
        let recorder = Recorder::answering(200);
        let mut c = client(&recorder);
        let cases: Vec<(Result<Response, ClientError>, &str)> = vec![
            (c.replies("atom", Some(2)), "/statuses/replies.atom?page=2"),
            (c.destroy_status(9, "json"), "/statuses/destroy/9.json"),
            (c.show_user("alice", "json"), "/users/show/alice.json"),
            (c.direct_messages("json", None, Some(5), None), "/direct_messages.json?since_id=5"),
            (c.sent_direct_messages("xml", None, None, Some(1)), "/direct_messages/sent.xml?page=1"),
            (c.destroy_direct_message(4, "json"), "/direct_messages/destroy/4.json"),
            (c.create_friendship("bob", "json"), "/friendships/create/bob.json"),
            (c.destroy_friendship("bob", "json"), "/friendships/destroy/bob.json"),
            (c.friendship_exists("alice", "bob", "none"), "/friendships/exists?user_a=alice&user_b=bob"),
            (c.archive("json", None, None, None), "/account/archive.json"),
            (c.update_location("NYC", "json"), "/account/update_location.json"),
            (c.update_delivery_device("IM", "json"), "/account/update_delivery_device.json"),
            (c.favorites("rss", None), "/favorites.rss"),
            (c.create_favorite(3, "xml"), "/favorites/create/3.xml"),
            (c.destroy_favorite(3, "xml"), "/favorites/destroy/3.xml"),
            (c.follow("bob", "json"), "/notifications/follow/bob.json"),
            (c.leave("bob", "json"), "/notifications/leave/bob.json"),
            (c.block("bob", "json"), "/blocks/create/bob.json"),
            (c.unblock("bob", "json"), "/blocks/destroy/bob.json"),
            (c.downtime_schedule("xml"), "/help/downtime_schedule.xml"),
        ];
        let requests = recorder.requests.borrow();
        assert_eq!(requests.len(), cases.len());
        for ((result, path), (req, _)) in cases.iter().zip(requests.iter()) {
            assert!(result.is_ok(), "{path}");
            assert_eq!(req.url, format!("http://localhost:3000{path}"));
        }
    }

    #[traced_test]
    #[test]
    fn missing_credentials_warn_and_passwords_stay_out_of_logs() {
        let recorder = Recorder::answering(401);
        let mut client = MicroblogClient::with_transport("http://localhost:3000", &recorder)
            .with_auth("alice", "hunter2-pass");
        let token = Credentials::new("alice", "hunter2-pass").basic_authorization();

        client.help_test("json").unwrap();
        assert!(logs_contain("dispatching request"));
        assert!(!logs_contain("without credentials"));

        client.clear_auth();
        let response = client.help_test("json").unwrap();
        assert_eq!(response.http_code(), 401);
        assert!(recorder.last().1.is_none());
        assert!(logs_contain("without credentials"));

        assert!(!logs_contain("hunter2-pass"));
        assert!(!logs_contain(token.trim_start_matches("Basic ")));
    }
}
