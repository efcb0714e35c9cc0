use std::io::{self, Write};
use std::path::Path;

use bytes::Bytes;
use tempfile::TempPath;
use url::Url;

/// A short-lived `file://` URL to a copy of a blob.
///
/// The backing temporary file is removed when the handle is dropped.
#[derive(Debug)]
pub struct ObjectUrl {
    url: Url,
    path: TempPath,
}

impl ObjectUrl {
    /// Copy `data` to a new temporary file and return its URL.
    pub async fn create(name: &str, data: Bytes) -> io::Result<Self> {
        let suffix = format!("-{}", sanitize(name));
        let path = tokio::task::spawn_blocking(move || -> io::Result<TempPath> {
            let mut file = tempfile::Builder::new()
                .prefix("vault-")
                .suffix(&suffix)
                .tempfile()?;
            file.write_all(&data)?;
            file.flush()?;
            Ok(file.into_temp_path())
        })
        .await
        .map_err(io::Error::other)??;

        let url = Url::from_file_path(&path)
            .map_err(|()| io::Error::other("temporary path is not absolute"))?;
        Ok(Self { url, path })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .collect()
}
