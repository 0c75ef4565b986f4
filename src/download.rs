use std::path::PathBuf;

use log::{info, warn};

use crate::archive;
use crate::bili_client::BiliClient;
use crate::configuration::Credentials;
use crate::error::DownloadError;
use crate::limiter::run_bounded;

/// Simultaneous episode downloads. Kept low because every episode fans out
/// to many image downloads of its own.
pub const EP_CONCURRENCY: usize = 2;
/// Simultaneous image downloads within one episode.
pub const IMAGE_CONCURRENCY: usize = 16;

#[derive(Debug)]
pub struct ChapterOutcome {
    pub ep_id: i64,
    pub archive: PathBuf,
    pub total_pages: usize,
    pub failed_pages: usize,
}

/// Download one episode: fetch the image manifest, pull every page under the
/// inner limiter, then archive the episode directory.
///
/// A failed manifest fetch or a failed archive step fails the episode;
/// individual page failures are logged and counted but never abort it.
pub async fn download_episode(
    client: &BiliClient,
    creds: &Credentials,
    ep_id: i64,
    dir: PathBuf,
) -> Result<ChapterOutcome, DownloadError> {
    let index = client.image_index(ep_id, creds).await?;
    index.ensure_ok()?;

    let paths = index.image_paths();
    let total_pages = paths.len();
    info!("episode {ep_id}: {total_pages} pages, downloading");

    let tasks: Vec<_> = paths
        .iter()
        .enumerate()
        .map(|(page, path)| {
            let dest = dir.join(page_filename(ep_id, page, path));
            download_page(client, creds, path, dest)
        })
        .collect();
    let outcome = run_bounded(tasks, IMAGE_CONCURRENCY).await;

    finish_episode(ep_id, dir, outcome).await
}

/// Count per-page failures and archive the episode directory anyway; only
/// the archive step can still fail the episode at this point.
async fn finish_episode(
    ep_id: i64,
    dir: PathBuf,
    outcome: Vec<Result<(), DownloadError>>,
) -> Result<ChapterOutcome, DownloadError> {
    let total_pages = outcome.len();
    let mut failed_pages = 0;
    for (page, result) in outcome.iter().enumerate() {
        if let Err(e) = result {
            failed_pages += 1;
            warn!("episode {ep_id} page {page} failed ({}): {e}", e.kind());
        }
    }
    info!(
        "episode {ep_id}: downloaded {}/{total_pages} pages, archiving",
        total_pages - failed_pages
    );

    // Pages are written lazily, so an episode with no successful page has no
    // directory and fails here.
    let archive = archive::create_zip(dir).await?;
    info!("episode {ep_id}: archive at {}", archive.display());

    Ok(ChapterOutcome {
        ep_id,
        archive,
        total_pages,
        failed_pages,
    })
}

async fn download_page(
    client: &BiliClient,
    creds: &Credentials,
    image_path: &str,
    dest: PathBuf,
) -> Result<(), DownloadError> {
    let token = client.image_token(image_path, creds).await?;
    token.ensure_ok()?;
    let url = token.resource_url()?;
    client.download_to(&url, &dest).await
}

/// Page files are named from the episode id, the zero-based manifest index
/// and whatever trails the last `.` of the remote path. The extension is
/// taken as-is; server paths are trusted elsewhere in the pipeline too.
fn page_filename(ep_id: i64, page: usize, image_path: &str) -> String {
    let ext = match image_path.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => image_path,
    };
    format!("{ep_id}_page_{page}.{ext}")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[tokio::test]
    async fn page_failures_are_counted_and_the_archive_still_runs() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("11_1_First");
        fs::create_dir_all(&dir).unwrap();

        // Five pages, indices 1 and 3 failed token resolution; the other
        // three landed on disk.
        let mut outcome: Vec<Result<(), DownloadError>> = Vec::new();
        for page in 0..5 {
            if page == 1 || page == 3 {
                outcome.push(Err(DownloadError::Api {
                    code: 62002,
                    message: "token refused".into(),
                }));
            } else {
                fs::write(dir.join(page_filename(11, page, "/bfs/manga/p.jpg")), b"img")
                    .unwrap();
                outcome.push(Ok(()));
            }
        }

        let chapter = finish_episode(11, dir, outcome).await.unwrap();
        assert_eq!(chapter.ep_id, 11);
        assert_eq!(chapter.total_pages, 5);
        assert_eq!(chapter.failed_pages, 2);
        assert_eq!(chapter.archive, tmp.path().join("11_1_First.zip"));

        let reader = fs::File::open(&chapter.archive).unwrap();
        let zip = zip::ZipArchive::new(reader).unwrap();
        assert_eq!(zip.len(), 3);
    }

    #[tokio::test]
    async fn episode_with_no_written_page_fails_at_the_archive_step() {
        let tmp = tempfile::tempdir().unwrap();
        // Every page failed, so nothing ever created the directory.
        let dir = tmp.path().join("12_2_Second");
        let outcome: Vec<Result<(), DownloadError>> = (0..3)
            .map(|_| {
                Err(DownloadError::RetriesExhausted {
                    attempts: 3,
                    context: "image token".into(),
                })
            })
            .collect();

        let err = finish_episode(12, dir, outcome).await.unwrap_err();
        assert!(matches!(err, DownloadError::Archive(_)));
    }

    #[test]
    fn page_filename_uses_manifest_index_and_remote_extension() {
        assert_eq!(
            page_filename(11, 0, "/bfs/manga/0001.jpg"),
            "11_page_0.jpg"
        );
        assert_eq!(
            page_filename(11, 12, "/bfs/manga/cover.large.webp"),
            "11_page_12.webp"
        );
    }

    #[test]
    fn extension_is_taken_verbatim_even_without_a_dot() {
        // A dotless path becomes the whole "extension".
        assert_eq!(
            page_filename(7, 3, "/bfs/manga/raw"),
            "7_page_3./bfs/manga/raw"
        );
    }
}
