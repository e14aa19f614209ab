use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt::Display;

pub const DEFAULT_BASE_URL: &str = "https://api.createsend.com";
pub const API_VERSION: &str = "v3.1";

/// Characters that would change the meaning of the `email` query value.
/// `@` and `.` are left alone so ordinary addresses go over the wire untouched.
const EMAIL_QUERY: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'=');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully qualified URL together with the verb used to call it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: Method,
    pub url: String,
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Builds Campaign Monitor endpoint URLs against a base host.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl Endpoints {
    pub fn new<S: AsRef<str>>(base_url: S) -> Self {
        Self {
            base: base_url.as_ref().trim_end_matches('/').to_string(),
        }
    }

    fn api_root(&self) -> String {
        format!("{}/api/{}", self.base, API_VERSION)
    }

    /// `POST /subscribers/{listID}.json`
    ///
    /// See <https://www.campaignmonitor.com/api/subscribers/#adding_a_subscriber>
    pub fn build_subscriber_endpoint(&self, list_id: &str) -> Endpoint {
        Endpoint {
            method: Method::Post,
            url: format!("{}/subscribers/{}.json", self.api_root(), list_id),
        }
    }

    /// `PUT /subscribers/{listID}.json?email={email}`
    ///
    /// See <https://www.campaignmonitor.com/api/subscribers/#updating_a_subscriber>
    pub fn build_update_endpoint(&self, list_id: &str, email: &str) -> Endpoint {
        Endpoint {
            method: Method::Put,
            url: format!(
                "{}/subscribers/{}.json?email={}",
                self.api_root(),
                list_id,
                encode_email(email)
            ),
        }
    }

    /// `POST /transactional/smartemail/{templateID}/send`
    ///
    /// See <https://www.campaignmonitor.com/api/transactional/#send_a_smart_email>
    pub fn build_transactional_endpoint(&self, template_id: &str) -> Endpoint {
        Endpoint {
            method: Method::Post,
            url: format!(
                "{}/transactional/smartemail/{}/send",
                self.api_root(),
                template_id
            ),
        }
    }

    /// `GET /subscribers/{listID}.json?email={email}`
    pub fn build_subscriber_details_endpoint(&self, list_id: &str, email: &str) -> Endpoint {
        Endpoint {
            method: Method::Get,
            url: format!(
                "{}/subscribers/{}.json?email={}",
                self.api_root(),
                list_id,
                encode_email(email)
            ),
        }
    }

    /// `GET /lists/{listID}/active.json`, one page ordered by email.
    pub fn build_active_subscribers_endpoint(
        &self,
        list_id: &str,
        page: usize,
        page_size: usize,
    ) -> Endpoint {
        Endpoint {
            method: Method::Get,
            url: format!(
                "{}/lists/{}/active.json?page={}&pagesize={}&orderfield=email&orderdirection=asc",
                self.api_root(),
                list_id,
                page,
                page_size
            ),
        }
    }
}

fn encode_email(email: &str) -> String {
    utf8_percent_encode(email, EMAIL_QUERY).to_string()
}
