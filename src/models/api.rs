use serde::Deserialize;

use crate::error::DownloadError;

fn ensure_code(code: i64, message: &str) -> Result<(), DownloadError> {
    if code == 0 {
        Ok(())
    } else {
        Err(DownloadError::Api {
            code,
            message: message.to_string(),
        })
    }
}

/// Cookie verification result (`x/web-interface/nav`).
#[derive(Deserialize, Debug)]
pub struct VerifyResult {
    pub code: i64,
    pub message: String,
    pub data: VerifyData,
}

#[derive(Deserialize, Debug)]
pub struct VerifyData {
    #[serde(rename = "isLogin")]
    pub is_login: bool,
    #[serde(default)]
    pub uname: Option<String>,
    #[serde(default)]
    pub mid: Option<i64>,
}

impl VerifyResult {
    pub fn is_logged_in(&self) -> bool {
        self.code == 0 && self.data.is_login
    }
}

/// Chapter list for one comic (`ComicDetail`).
#[derive(Deserialize, Debug)]
pub struct ComicDetail {
    pub code: i64,
    pub msg: String,
    pub data: ComicData,
}

#[derive(Deserialize, Debug)]
pub struct ComicData {
    pub id: i64,
    pub title: String,
    pub total: i64,
    pub ep_list: Vec<Episode>,
}

#[derive(Deserialize, Debug)]
pub struct Episode {
    pub id: i64,
    pub ord: i64,
    pub title: String,
    pub short_title: String,
    pub cover: String,
}

impl ComicDetail {
    pub fn ensure_ok(&self) -> Result<(), DownloadError> {
        ensure_code(self.code, &self.msg)
    }
}

impl ComicData {
    pub fn find_ep(&self, ep_id: i64) -> Option<&Episode> {
        self.ep_list.iter().find(|ep| ep.id == ep_id)
    }

    pub fn contains_ep(&self, ep_id: i64) -> bool {
        self.find_ep(ep_id).is_some()
    }
}

/// Ordered image manifest for one chapter (`GetImageIndex`).
/// Manifest order defines page numbering.
#[derive(Deserialize, Debug)]
pub struct ImageIndex {
    pub code: i64,
    pub msg: String,
    pub data: ImageIndexData,
}

#[derive(Deserialize, Debug)]
pub struct ImageIndexData {
    pub images: Vec<ImageRef>,
}

#[derive(Deserialize, Debug)]
pub struct ImageRef {
    pub path: String,
    pub x: i64,
    pub y: i64,
}

impl ImageIndex {
    pub fn ensure_ok(&self) -> Result<(), DownloadError> {
        ensure_code(self.code, &self.msg)
    }

    pub fn image_paths(&self) -> Vec<&str> {
        self.data.images.iter().map(|img| img.path.as_str()).collect()
    }
}

/// Signed download credential for one image (`ImageToken`).
#[derive(Deserialize, Debug)]
pub struct ImageToken {
    pub code: i64,
    pub msg: String,
    pub data: Vec<TokenEntry>,
}

#[derive(Deserialize, Debug)]
pub struct TokenEntry {
    pub url: String,
    pub token: String,
}

impl ImageToken {
    pub fn ensure_ok(&self) -> Result<(), DownloadError> {
        ensure_code(self.code, &self.msg)
    }

    /// The final download URL: `url + "?token=" + token`.
    pub fn resource_url(&self) -> Result<String, DownloadError> {
        let entry = self.data.first().ok_or_else(|| {
            DownloadError::Decode("image token response contained no entries".into())
        })?;
        Ok(format!("{}?token={}", entry.url, entry.token))
    }
}
