use reqwest::blocking::Client;
use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, CONNECTION, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE,
    HeaderMap, HeaderValue, USER_AGENT,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::base_system::context::Config;
use crate::base_system::course_paths::course_name_from_url;
use crate::download::fetcher::{FetchError, FetchResponse, Fetcher, ResourceHeaders};

pub const LOGIN_URL: &str = "https://www.coursera.org/maestro/api/user/login";
const REDIRECT_URL_TEMPLATE: &str = "https://class.coursera.org/{name}/auth/auth_redirector?type=login&subtype=normal&email=&visiting=%2F{name}%2Flecture%2Findex&minimal=true";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("http client init failed: {0}")]
    Client(#[source] reqwest::Error),
    #[error("登录失败（{user}）: {reason}")]
    Login { user: String, reason: String },
    #[error("获取讲座页失败 {url}: {reason}")]
    Page { url: String, reason: String },
}

/// 带 Cookie 的会话：登录、取讲座页、下载资源共用同一个客户端。
pub struct CourseraSession {
    client: Client,
}

impl CourseraSession {
    pub fn new(config: &Config) -> Result<Self, SessionError> {
        // 不启用 gzip 解码，要求服务器原样返回
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        default_headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or(HeaderValue::from_static("Mozilla/5.0")),
        );

        let client = Client::builder()
            .default_headers(default_headers)
            .cookie_store(true)
            .timeout(config.request_timeout())
            .build()
            .map_err(SessionError::Client)?;

        Ok(Self { client })
    }

    pub fn login(&self, username: &str, password: &str) -> Result<(), SessionError> {
        let login_err = |reason: String| SessionError::Login {
            user: username.to_string(),
            reason,
        };

        let resp = self
            .client
            .post(LOGIN_URL)
            .form(&[("email_address", username), ("password", password)])
            .send()
            .map_err(|e| login_err(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(login_err(format!("http status {}", status.as_u16())));
        }

        info!(target: "session", "已登录: {}", username);
        Ok(())
    }

    /// 先访问课程的登录跳转地址以拿到课程域下的 Cookie，再读取讲座页。
    pub fn fetch_lecture_page(&self, course_url: &str) -> Result<String, SessionError> {
        let page_err = |reason: String| SessionError::Page {
            url: course_url.to_string(),
            reason,
        };

        if let Some(name) = course_name_from_url(course_url) {
            let redirect = REDIRECT_URL_TEMPLATE.replace("{name}", &name);
            match self.client.get(&redirect).send() {
                Ok(resp) => debug!(target: "session", "跳转地址响应: {}", resp.status()),
                Err(e) => debug!(target: "session", "访问跳转地址失败(忽略): {}", e),
            }
        }

        info!(target: "session", "正在获取讲座页: {}", course_url);
        let resp = self
            .client
            .get(course_url)
            .send()
            .map_err(|e| page_err(e.to_string()))?;
        let resp = resp
            .error_for_status()
            .map_err(|e| page_err(e.to_string()))?;
        resp.text().map_err(|e| page_err(e.to_string()))
    }
}

fn header_str(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub(crate) fn resource_headers(headers: &HeaderMap) -> ResourceHeaders {
    ResourceHeaders {
        content_type: header_str(headers, CONTENT_TYPE),
        content_disposition: header_str(headers, CONTENT_DISPOSITION),
        content_length: header_str(headers, CONTENT_LENGTH).and_then(|v| v.trim().parse().ok()),
    }
}

impl Fetcher for CourseraSession {
    fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        Ok(FetchResponse {
            headers: resource_headers(resp.headers()),
            body: Box::new(resp),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_the_three_resource_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static(r#"attachment; filename="a.pdf""#),
        );
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("2048"));

        let parsed = resource_headers(&headers);
        assert_eq!(parsed.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(parsed.attachment_filename().as_deref(), Some("a.pdf"));
        assert_eq!(parsed.content_length, Some(2048));
    }

    #[test]
    fn invalid_length_is_treated_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("n/a"));
        assert_eq!(resource_headers(&headers), ResourceHeaders::default());
    }

    #[test]
    fn session_builds_from_default_config() {
        assert!(CourseraSession::new(&Config::default()).is_ok());
    }
}
