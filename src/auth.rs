// Portal login: GET the root page, read the arithmetic challenge out of two
// hidden inputs, then POST the credentials along with the sum.
//
// The markup and the response phrases below are the portal's de facto
// contract. They are matched literally; if the portal changes them, login
// fails with a parse or unknown-status error instead of guessing.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::api::{PortalRequest, PortalResponse, Transport, DESKTOP_USER_AGENT, LEGACY_USER_AGENT};
use crate::config::Config;
use crate::error::AuthError;
use crate::proxy::ProxyEndpoint;

pub const SESSION_COOKIE: &str = "ASP.NET_SessionId";

/// Phrase present on the landing page only after a successful login.
pub const SUCCESS_MARKER: &str = "View Profile";
pub const BAD_CREDENTIALS_MARKER: &str = "Username or password is incorrect";
pub const BAD_ANSWER_MARKER: &str = "Invalid answer";

static FIRST_NO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<input type="hidden" name="FirstNo" value="([^"]+)""#).unwrap());
static SECOND_NO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<input type="hidden" name="SecondNo" value="([^"]+)""#).unwrap());

/// Student id and password for one login attempt.
#[derive(Clone)]
pub struct Credentials {
    pub student_id: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("student_id", &self.student_id)
            .field("password", &"***")
            .finish()
    }
}

/// The two operands of the login challenge, kept exactly as the page
/// carried them so they can be posted back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeValues {
    pub first: String,
    pub second: String,
    sum: i64,
}

impl ChallengeValues {
    /// Check both operands are integers whose sum fits in an `i64`.
    pub fn new(first: &str, second: &str) -> Result<Self, AuthError> {
        let a = operand(first, "FirstNo")?;
        let b = operand(second, "SecondNo")?;
        let sum = a.checked_add(b).ok_or_else(|| {
            AuthError::ParseFailed(format!("challenge sum {first} + {second} overflows"))
        })?;
        Ok(ChallengeValues {
            first: first.to_string(),
            second: second.to_string(),
            sum,
        })
    }

    /// The answer the portal expects: the plain decimal sum.
    pub fn answer(&self) -> String {
        self.sum.to_string()
    }
}

fn operand(raw: &str, name: &str) -> Result<i64, AuthError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AuthError::ParseFailed(format!("hidden field {name} is not a number: {raw:?}")))
}

/// Portal-issued session cookie value.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        SessionToken(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Pull `FirstNo` and `SecondNo` out of the login page.
pub fn parse_challenge(html: &str) -> Result<ChallengeValues, AuthError> {
    let first = hidden_value(&FIRST_NO, html, "FirstNo")?;
    let second = hidden_value(&SECOND_NO, html, "SecondNo")?;
    ChallengeValues::new(first, second)
}

fn hidden_value<'h>(re: &Regex, html: &'h str, name: &str) -> Result<&'h str, AuthError> {
    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| AuthError::ParseFailed(format!("hidden field {name} not found")))
}

/// Decide how a login POST went from the page it returned. Checked in
/// priority order: success, bad credentials, bad answer, anything else.
pub fn classify_login_response(body: &str) -> Result<(), AuthError> {
    if body.contains(SUCCESS_MARKER) {
        Ok(())
    } else if body.contains(BAD_CREDENTIALS_MARKER) {
        Err(AuthError::BadCredentials)
    } else if body.contains(BAD_ANSWER_MARKER) {
        Err(AuthError::ChallengeRejected)
    } else {
        Err(AuthError::Unknown)
    }
}

/// Performs the two-step portal login.
pub struct PortalSession<'a, T> {
    transport: &'a T,
    config: &'a Config,
}

impl<'a, T: Transport> PortalSession<'a, T> {
    pub fn new(transport: &'a T, config: &'a Config) -> Self {
        PortalSession { transport, config }
    }

    /// Log in and return the session token for later API calls.
    pub fn authenticate(
        &self,
        credentials: &Credentials,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<SessionToken, AuthError> {
        let timeout = self.config.timeout_for(proxy);

        let landing = PortalRequest::get(&self.config.portal_url, timeout)
            .header("User-Agent", LEGACY_USER_AGENT)
            .header("Pragma", "no-cache")
            .header("Accept", "*/*")
            .via(proxy);
        let page = self.send_ok(&landing)?;

        let challenge = parse_challenge(&page.body)?;
        let token = page
            .cookie(SESSION_COOKIE)
            .filter(|v| !v.is_empty())
            .map(SessionToken::new)
            .ok_or(AuthError::NoSession)?;
        log::debug!("login challenge received, session cookie present");

        // The cookie is attached by hand: the POST must not depend on a
        // cookie store shared with the GET.
        let login = PortalRequest::post_form(&self.config.portal_url, timeout)
            .header("User-Agent", DESKTOP_USER_AGENT)
            .header("Cookie", &format!("{SESSION_COOKIE}={}", token.as_str()))
            .field("Username", &credentials.student_id)
            .field("Password", &credentials.password)
            .field("Answer", &challenge.answer())
            .field("FirstNo", &challenge.first)
            .field("SecondNo", &challenge.second)
            .via(proxy);
        let result = self.send_ok(&login)?;

        classify_login_response(&result.body)?;
        log::info!("login accepted");
        Ok(token)
    }

    fn send_ok(&self, request: &PortalRequest) -> Result<PortalResponse, AuthError> {
        let res = self.transport.send(request).map_err(|e| {
            log::warn!("portal request to {} failed: {e}", request.url);
            AuthError::ConnectionFailed(e.0)
        })?;
        if res.status != 200 {
            return Err(AuthError::ConnectionFailed(format!(
                "portal answered HTTP {}",
                res.status
            )));
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RequestMethod;
    use crate::error::TransportError;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    const LOGIN_PAGE: &str = r#"<form method="post">
        <input type="hidden" name="FirstNo" value="7" />
        <input type="hidden" name="SecondNo" value="15" />
        <input name="Answer" />
    </form>"#;

    /// Replays canned responses in order and keeps the requests it saw.
    struct Scripted {
        replies: RefCell<VecDeque<Result<PortalResponse, TransportError>>>,
        seen: RefCell<Vec<PortalRequest>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<PortalResponse, TransportError>>) -> Self {
            Scripted {
                replies: RefCell::new(replies.into()),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transport for Scripted {
        fn send(&self, request: &PortalRequest) -> Result<PortalResponse, TransportError> {
            self.seen.borrow_mut().push(request.clone());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError("no scripted reply".into())))
        }
    }

    fn landing() -> Result<PortalResponse, TransportError> {
        Ok(PortalResponse {
            status: 200,
            body: LOGIN_PAGE.into(),
            cookies: vec![(SESSION_COOKIE.into(), "sess-42".into())],
        })
    }

    fn page(body: &str) -> Result<PortalResponse, TransportError> {
        Ok(PortalResponse {
            status: 200,
            body: body.into(),
            cookies: vec![],
        })
    }

    fn creds() -> Credentials {
        Credentials {
            student_id: "2021-1-60-001".into(),
            password: "hunter2".into(),
        }
    }

    #[test]
    fn test_parse_challenge() {
        let values = parse_challenge(LOGIN_PAGE).unwrap();
        assert_eq!(values.first, "7");
        assert_eq!(values.second, "15");
        assert_eq!(values.answer(), "22");
    }

    #[test]
    fn test_answer_has_no_padding() {
        let values = ChallengeValues::new("0", "9").unwrap();
        assert_eq!(values.answer(), "9");
        let values = ChallengeValues::new("40", "60").unwrap();
        assert_eq!(values.answer(), "100");
        let values = ChallengeValues::new("07", "03").unwrap();
        assert_eq!(values.answer(), "10");
    }

    #[test]
    fn test_overflowing_challenge_is_a_parse_failure() {
        let html = r#"<input type="hidden" name="FirstNo" value="9223372036854775807" />
                      <input type="hidden" name="SecondNo" value="1" />"#;
        assert!(matches!(parse_challenge(html), Err(AuthError::ParseFailed(_))));
        assert!(ChallengeValues::new("-9223372036854775808", "-1").is_err());
        assert_eq!(
            ChallengeValues::new("9223372036854775806", "1").unwrap().answer(),
            "9223372036854775807"
        );
    }

    #[test]
    fn test_operands_posted_back_verbatim() {
        let page_with_zeros = r#"<input type="hidden" name="FirstNo" value="07" />
                      <input type="hidden" name="SecondNo" value="015" />"#;
        let transport = Scripted::new(vec![
            Ok(PortalResponse {
                status: 200,
                body: page_with_zeros.into(),
                cookies: vec![(SESSION_COOKIE.into(), "sess-42".into())],
            }),
            page("View Profile"),
        ]);
        let cfg = Config::default();
        PortalSession::new(&transport, &cfg)
            .authenticate(&creds(), None)
            .unwrap();

        let seen = transport.seen.borrow();
        let form = &seen[1].form;
        assert!(form.contains(&("FirstNo".to_string(), "07".to_string())));
        assert!(form.contains(&("SecondNo".to_string(), "015".to_string())));
        assert!(form.contains(&("Answer".to_string(), "22".to_string())));
    }

    #[test]
    fn test_parse_challenge_missing_field() {
        let html = r#"<input type="hidden" name="FirstNo" value="3" />"#;
        assert!(matches!(parse_challenge(html), Err(AuthError::ParseFailed(_))));
    }

    #[test]
    fn test_parse_challenge_does_not_guess_names() {
        let html = r#"<input type="hidden" name="firstNo" value="3" />
                      <input type="hidden" name="secondNo" value="4" />"#;
        assert!(matches!(parse_challenge(html), Err(AuthError::ParseFailed(_))));
    }

    #[test]
    fn test_parse_challenge_non_numeric() {
        let html = r#"<input type="hidden" name="FirstNo" value="x" />
                      <input type="hidden" name="SecondNo" value="4" />"#;
        assert!(matches!(parse_challenge(html), Err(AuthError::ParseFailed(_))));
    }

    #[test]
    fn test_classify_priority() {
        assert_eq!(
            classify_login_response("View Profile ... Username or password is incorrect"),
            Ok(())
        );
        assert_eq!(
            classify_login_response("Username or password is incorrect. Invalid answer"),
            Err(AuthError::BadCredentials)
        );
        assert_eq!(
            classify_login_response("Invalid answer"),
            Err(AuthError::ChallengeRejected)
        );
        assert_eq!(classify_login_response("<html></html>"), Err(AuthError::Unknown));
    }

    #[test]
    fn test_authenticate_success() {
        let transport = Scripted::new(vec![landing(), page("<a>View Profile</a>")]);
        let cfg = Config::default();
        let token = PortalSession::new(&transport, &cfg)
            .authenticate(&creds(), None)
            .unwrap();
        assert_eq!(token.as_str(), "sess-42");

        let seen = transport.seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].method, RequestMethod::Get);
        let post = &seen[1];
        assert_eq!(post.method, RequestMethod::PostForm);
        assert_eq!(post.header_value("Cookie"), Some("ASP.NET_SessionId=sess-42"));
        let field = |name: &str| {
            post.form
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(field("Username").as_deref(), Some("2021-1-60-001"));
        assert_eq!(field("Password").as_deref(), Some("hunter2"));
        assert_eq!(field("Answer").as_deref(), Some("22"));
        assert_eq!(field("FirstNo").as_deref(), Some("7"));
        assert_eq!(field("SecondNo").as_deref(), Some("15"));
    }

    #[test]
    fn test_authenticate_bad_credentials() {
        let transport = Scripted::new(vec![
            landing(),
            page("<p>Username or password is incorrect</p>"),
        ]);
        let cfg = Config::default();
        let result = PortalSession::new(&transport, &cfg).authenticate(&creds(), None);
        assert_eq!(result, Err(AuthError::BadCredentials));
    }

    #[test]
    fn test_authenticate_without_session_cookie() {
        let transport = Scripted::new(vec![page(LOGIN_PAGE)]);
        let cfg = Config::default();
        let result = PortalSession::new(&transport, &cfg).authenticate(&creds(), None);
        assert_eq!(result, Err(AuthError::NoSession));
        assert_eq!(transport.seen.borrow().len(), 1);
    }

    #[test]
    fn test_authenticate_transport_failure() {
        let transport = Scripted::new(vec![Err(TransportError("dns error".into()))]);
        let cfg = Config::default();
        let result = PortalSession::new(&transport, &cfg).authenticate(&creds(), None);
        assert_eq!(result, Err(AuthError::ConnectionFailed("dns error".into())));
    }

    #[test]
    fn test_authenticate_non_200_landing() {
        let transport = Scripted::new(vec![Ok(PortalResponse {
            status: 502,
            ..Default::default()
        })]);
        let cfg = Config::default();
        let result = PortalSession::new(&transport, &cfg).authenticate(&creds(), None);
        assert!(matches!(result, Err(AuthError::ConnectionFailed(_))));
    }

    #[test]
    fn test_authenticate_via_proxy_uses_proxy_timeout() {
        let transport = Scripted::new(vec![landing(), page("View Profile")]);
        let cfg = Config::default();
        let proxy: ProxyEndpoint = "1.2.3.4:8080".parse().unwrap();
        PortalSession::new(&transport, &cfg)
            .authenticate(&creds(), Some(&proxy))
            .unwrap();
        for req in transport.seen.borrow().iter() {
            assert_eq!(req.proxy.as_ref(), Some(&proxy));
            assert_eq!(req.timeout, cfg.proxy_timeout);
        }
    }

    /// Collects formatted log lines so tests can check what was written.
    struct CaptureLog(std::sync::Mutex<Vec<String>>);

    impl log::Log for CaptureLog {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            if let Ok(mut lines) = self.0.lock() {
                lines.push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: CaptureLog = CaptureLog(std::sync::Mutex::new(Vec::new()));

    #[test]
    fn test_login_logs_carry_no_credentials() {
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Trace);

        let transport = Scripted::new(vec![landing(), page("View Profile")]);
        let cfg = Config::default();
        PortalSession::new(&transport, &cfg)
            .authenticate(&creds(), None)
            .unwrap();

        let lines = CAPTURE.0.lock().unwrap();
        assert!(lines.iter().any(|l| l == "login accepted"));
        for line in lines.iter() {
            assert!(!line.contains("2021-1-60-001"), "{line}");
            assert!(!line.contains("hunter2"), "{line}");
            assert!(!line.contains("sess-42"), "{line}");
        }
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let shown = format!("{:?}", creds());
        assert!(!shown.contains("hunter2"));
    }
}
