use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};

use crate::APP_FOLDER_NAME;

pub fn app_folder() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_FOLDER_NAME))
}

pub fn md5_file(file_path: &Path) -> io::Result<String> {
    let f = File::open(file_path)?;
    let len = f.metadata()?.len();
    // 1MB at most, canary files are usually a few KB
    let buf_len = len.clamp(1, 1_000_000) as usize;
    let mut buf = BufReader::with_capacity(buf_len, f);
    let mut context = md5::Context::new();
    loop {
        let part = buf.fill_buf()?;
        if part.is_empty() {
            break;
        }
        context.consume(part);
        let part_len = part.len();
        buf.consume(part_len);
    }
    Ok(format!("{:x}", context.compute()))
}

pub fn last_modified(path: &Path) -> io::Result<DateTime<Utc>> {
    let modified = path.metadata()?.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}

pub fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}
