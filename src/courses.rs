// Course listing client: one authorised GET against the JSON endpoint,
// plus the record type the rest of the program works with.

use serde::{Deserialize, Deserializer, Serialize};

use crate::api::{PortalRequest, Transport, MOBILE_USER_AGENT};
use crate::auth::{SessionToken, SESSION_COOKIE};
use crate::config::Config;
use crate::error::FetchError;
use crate::proxy::ProxyEndpoint;
use crate::schedule::DayTimeSlot;

/// One scheduled section as returned by the portal. Missing or null fields
/// decode to empty text or zero; unknown fields are ignored.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CourseRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub course_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub section_name: String,
    /// Instructor initials.
    #[serde(default, deserialize_with = "null_as_default")]
    pub short_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub seat_capacity: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub seat_taken: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_slot_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub room_name: String,
}

impl CourseRecord {
    /// Seats left. Negative when the portal reports more seats taken than
    /// exist; the value is passed through as is.
    pub fn available(&self) -> i64 {
        self.seat_capacity - self.seat_taken
    }

    pub fn slot(&self) -> DayTimeSlot {
        DayTimeSlot::decode(&self.time_slot_name)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode a course listing body. Anything other than a JSON array of
/// course objects is a malformed payload.
pub fn parse_courses(body: &str) -> Result<Vec<CourseRecord>, FetchError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedPayload(format!("response is not JSON: {e}")))?;
    if !value.is_array() {
        return Err(FetchError::MalformedPayload(
            "expected a JSON array of courses".into(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|e| FetchError::MalformedPayload(format!("undecodable course entry: {e}")))
}

/// Fetch the full routine for the logged-in student.
pub fn fetch_courses<T: Transport>(
    transport: &T,
    config: &Config,
    token: &SessionToken,
    proxy: Option<&ProxyEndpoint>,
) -> Result<Vec<CourseRecord>, FetchError> {
    let cookie = format!(
        "{SESSION_COOKIE}={}; {}",
        token.as_str(),
        config.tracking_cookie
    );
    let request = PortalRequest::get(&config.courses_url, config.timeout_for(proxy))
        .header("Accept", "application/json, text/plain, */*")
        .header("User-Agent", MOBILE_USER_AGENT)
        .header("Referer", &config.courses_referer)
        .header("Cookie", &cookie)
        .via(proxy);

    let res = transport.send(&request).map_err(|e| {
        log::warn!("course request failed: {e}");
        FetchError::ConnectionFailed(e.0)
    })?;

    match res.status {
        200 => {
            let courses = parse_courses(&res.body)?;
            log::info!("fetched {} course sections", courses.len());
            Ok(courses)
        }
        401 | 403 => Err(FetchError::SessionExpired),
        code => Err(FetchError::HttpError(code)),
    }
}
