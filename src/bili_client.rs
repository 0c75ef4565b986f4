use std::path::Path;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::{json, Value};
use url::Url;

use crate::configuration::{Credentials, Settings};
use crate::error::DownloadError;
use crate::retry::with_retry;

const NAV_URL: &str = "https://api.bilibili.com/x/web-interface/nav";
const TWIRP_BASE: &str = "https://manga.bilibili.com/twirp/comic.v1.Comic";

/// Metadata calls use the client default; bulk byte downloads get longer.
const API_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(20);

/// Total invocations per transport call before giving up.
const RETRY_LIMIT: u32 = 3;

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9"),
    );
    headers.insert("dnt", HeaderValue::from_static("1"));
    headers.insert(
        header::ORIGIN,
        HeaderValue::from_static("https://manga.bilibili.com"),
    );
    headers.insert(
        header::REFERER,
        HeaderValue::from_static("https://manga.bilibili.com/"),
    );
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/101.0.4951.67 Safari/537.36",
        ),
    );
    headers
}

fn twirp_url(method: &str) -> Result<Url, DownloadError> {
    let url = Url::parse_with_params(
        &format!("{TWIRP_BASE}/{method}"),
        [("device", "pc"), ("platform", "web")],
    )?;
    Ok(url)
}

/// One shared HTTP session for the whole run. `reqwest::Client` pools
/// connections and is safe to use from many concurrent tasks.
pub struct BiliClient {
    http: reqwest::Client,
}

impl BiliClient {
    pub fn new(settings: &Settings) -> Result<Self, DownloadError> {
        let mut builder = reqwest::Client::builder()
            .default_headers(default_headers())
            .timeout(API_TIMEOUT);
        if let Some(proxy) = &settings.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            http: builder.build()?,
        })
    }

    /// Verify the stored cookies against the account endpoint.
    pub async fn verify_cookies(
        &self,
        creds: &Credentials,
    ) -> Result<crate::models::VerifyResult, DownloadError> {
        let url = Url::parse(NAV_URL)?;
        let raw = with_retry(
            || self.get_json(url.clone(), creds),
            RETRY_LIMIT,
            "cookie verification",
        )
        .await?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Chapter list for one comic.
    pub async fn comic_detail(
        &self,
        comic_id: i64,
        creds: &Credentials,
    ) -> Result<crate::models::ComicDetail, DownloadError> {
        let url = twirp_url("ComicDetail")?;
        let body = json!({ "comic_id": comic_id.to_string() });
        let raw = with_retry(
            || self.post_json(url.clone(), &body, creds),
            RETRY_LIMIT,
            "comic detail",
        )
        .await?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Ordered image manifest for one episode.
    pub async fn image_index(
        &self,
        ep_id: i64,
        creds: &Credentials,
    ) -> Result<crate::models::ImageIndex, DownloadError> {
        let url = twirp_url("GetImageIndex")?;
        let body = json!({ "ep_id": ep_id.to_string() });
        let context = format!("image index for episode {ep_id}");
        let raw = with_retry(
            || self.post_json(url.clone(), &body, creds),
            RETRY_LIMIT,
            &context,
        )
        .await?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Fresh download token for one image path. Tokens are short-lived and
    /// requested per image. The endpoint wants the paths as a JSON-encoded
    /// array embedded in a string field.
    pub async fn image_token(
        &self,
        image_path: &str,
        creds: &Credentials,
    ) -> Result<crate::models::ImageToken, DownloadError> {
        let url = twirp_url("ImageToken")?;
        let body = json!({ "urls": serde_json::to_string(&[image_path])? });
        let context = format!("image token for {image_path}");
        let raw = with_retry(
            || self.post_json(url.clone(), &body, creds),
            RETRY_LIMIT,
            &context,
        )
        .await?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Download a signed URL into a file, creating parent directories on
    /// demand. The signed URL already authorizes the read, so no cookies.
    pub async fn download_to(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        let bytes = with_retry(|| self.get_bytes(url), RETRY_LIMIT, url).await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }

    async fn get_json(&self, url: Url, creds: &Credentials) -> Result<Value, DownloadError> {
        let mut request = self.http.get(url);
        if let Some(cookie) = creds.cookie_header() {
            request = request.header(header::COOKIE, cookie);
        }
        let response = request.send().await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn post_json(
        &self,
        url: Url,
        body: &Value,
        creds: &Credentials,
    ) -> Result<Value, DownloadError> {
        let mut request = self.http.post(url).json(body);
        if let Some(cookie) = creds.cookie_header() {
            request = request.header(header::COOKIE, cookie);
        }
        let response = request.send().await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let response = self.http.get(url).timeout(DOWNLOAD_TIMEOUT).send().await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twirp_urls_carry_the_fixed_query() {
        let url = twirp_url("ComicDetail").unwrap();
        assert_eq!(url.host_str(), Some("manga.bilibili.com"));
        assert_eq!(url.path(), "/twirp/comic.v1.Comic/ComicDetail");
        assert_eq!(url.query(), Some("device=pc&platform=web"));
    }

    #[test]
    fn token_request_body_json_encodes_the_path_array() {
        let body = json!({
            "urls": serde_json::to_string(&["/bfs/manga/p1.jpg"]).unwrap()
        });
        assert_eq!(body["urls"], "[\"/bfs/manga/p1.jpg\"]");
    }
}
