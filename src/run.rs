use std::path::PathBuf;

use log::{error, info, warn};
use time::OffsetDateTime;

use crate::archive::sanitize_filename;
use crate::bili_client::BiliClient;
use crate::configuration::{Credentials, Settings};
use crate::download::{download_episode, EP_CONCURRENCY};
use crate::error::DownloadError;
use crate::limiter::run_bounded;
use crate::models::api::{ComicData, Episode};

pub async fn run(
    settings: Settings,
    comic_id: i64,
    ep_id: Option<i64>,
) -> Result<(), DownloadError> {
    let client = BiliClient::new(&settings)?;

    let creds = settings.credentials();
    let creds = if creds.is_configured() {
        verify_credentials(&client, creds).await
    } else {
        warn!("no bilibili cookies configured, only free episodes can be downloaded");
        creds
    };

    let detail = client.comic_detail(comic_id, &creds).await?;
    detail.ensure_ok()?;
    let comic = detail.data;
    info!(
        "comic \"{}\": {} episodes listed",
        comic.title, comic.total
    );

    let selected = select_episodes(&comic, ep_id)?;
    let run_dir = run_directory(&settings, comic_id, &comic.title);

    let tasks: Vec<_> = selected
        .iter()
        .map(|ep| {
            let dir = run_dir.join(episode_dir_name(ep));
            download_episode(&client, &creds, ep.id, dir)
        })
        .collect();
    let total_eps = tasks.len();
    let outcome = run_bounded(tasks, EP_CONCURRENCY).await;

    let mut failed_eps = 0;
    let mut total_pages = 0;
    let mut failed_pages = 0;
    for (ep, result) in selected.iter().zip(&outcome) {
        match result {
            Ok(chapter) => {
                total_pages += chapter.total_pages;
                failed_pages += chapter.failed_pages;
            }
            Err(e) => {
                failed_eps += 1;
                error!(
                    "episode {} (\"{}\") failed ({}): {e}",
                    ep.id,
                    ep.short_title,
                    e.kind()
                );
            }
        }
    }

    info!(
        "comic \"{}\" finished: {}/{} episodes succeeded, {}/{} pages downloaded",
        comic.title,
        total_eps - failed_eps,
        total_eps,
        total_pages - failed_pages,
        total_pages
    );
    Ok(())
}

/// Check the stored cookies against the account endpoint. Invalid or
/// unverifiable cookies are replaced by a cleared value and the run goes on
/// unauthenticated.
async fn verify_credentials(client: &BiliClient, creds: Credentials) -> Credentials {
    match client.verify_cookies(&creds).await {
        Ok(verify) if verify.is_logged_in() => {
            info!(
                "bilibili cookies verified, logged in as {}",
                verify.data.uname.unwrap_or_default()
            );
            creds
        }
        Ok(verify) => {
            warn!(
                "bilibili cookie verification failed ({}), continuing without login",
                verify.message
            );
            Credentials::cleared()
        }
        Err(e) => {
            warn!("bilibili cookie verification request failed: {e}, continuing without login");
            Credentials::cleared()
        }
    }
}

fn select_episodes(comic: &ComicData, ep_id: Option<i64>) -> Result<Vec<&Episode>, DownloadError> {
    match ep_id {
        None => Ok(comic.ep_list.iter().collect()),
        Some(id) => {
            let ep = comic.find_ep(id).ok_or_else(|| {
                DownloadError::Validation(format!(
                    "episode {id} does not belong to comic \"{}\"",
                    comic.title
                ))
            })?;
            Ok(vec![ep])
        }
    }
}

/// Run-scoped root directory. The UTC timestamp suffix keeps repeated runs
/// for the same comic from overwriting each other.
fn run_directory(settings: &Settings, comic_id: i64, title: &str) -> PathBuf {
    let now = OffsetDateTime::now_utc();
    let stamp = format!(
        "{:04}{:02}{:02}-{:02}{:02}{:02}",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    );
    settings
        .output_root()
        .join(format!("{comic_id}_{}_{stamp}", sanitize_filename(title)))
}

fn episode_dir_name(ep: &Episode) -> String {
    format!(
        "{}_{}_{}",
        ep.id,
        sanitize_filename(&ep.short_title),
        sanitize_filename(&ep.title)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comic_fixture() -> ComicData {
        serde_json::from_str(
            r#"{
                "id": 31031,
                "title": "What If: C/D?",
                "total": 2,
                "ep_list": [
                    {"id": 11, "ord": 1, "title": "One?", "short_title": "1",
                     "cover": "https://i0.example/a.jpg"},
                    {"id": 12, "ord": 2, "title": "Two", "short_title": "2",
                     "cover": "https://i0.example/b.jpg"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn all_episodes_selected_when_no_id_requested() {
        let comic = comic_fixture();
        let selected = select_episodes(&comic, None).unwrap();
        assert_eq!(
            selected.iter().map(|ep| ep.id).collect::<Vec<_>>(),
            vec![11, 12]
        );
    }

    #[test]
    fn single_episode_selected_by_id() {
        let comic = comic_fixture();
        let selected = select_episodes(&comic, Some(12)).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, 12);
    }

    #[test]
    fn unknown_episode_id_is_a_validation_error() {
        let comic = comic_fixture();
        let err = select_episodes(&comic, Some(99)).unwrap_err();
        assert!(matches!(err, DownloadError::Validation(_)));
    }

    #[test]
    fn run_directory_carries_sanitized_title_and_timestamp() {
        let settings = Settings {
            output_directory: "download".into(),
            sessdata: None,
            bili_jct: None,
            proxy: None,
        };
        let dir = run_directory(&settings, 31031, "What If: C/D?");
        let name = dir.file_name().unwrap().to_str().unwrap();

        let (prefix, stamp) = name.rsplit_once('_').unwrap();
        assert_eq!(prefix, "31031_What If_ C_D？");
        let (date, time) = stamp.split_once('-').unwrap();
        assert_eq!(date.len(), 8);
        assert_eq!(time.len(), 6);
        assert!(date.chars().all(|c| c.is_ascii_digit()));
        assert!(time.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn episode_directories_use_sanitized_titles() {
        let comic = comic_fixture();
        let ep = comic.find_ep(11).unwrap();
        assert_eq!(episode_dir_name(ep), "11_1_One？");
    }
}
