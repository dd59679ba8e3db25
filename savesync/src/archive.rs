use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use walkdir::WalkDir;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

use savesync_core::ARCHIVE_EXTENSION;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive io error : {0}")]
    Io(#[from] io::Error),
    #[error("Zip error : {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Walk error : {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Archive entry '{0}' is outside of the destination folder")]
    UnsafeEntry(String),
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
}

/// Directory <-> single blob
pub trait ArchiveCodec {
    /// Archive `directory` into a new file of `destination` folder. Entries are
    /// relative to `directory` parent, so they all start with its name.
    fn pack(&self, directory: &Path, destination: &Path) -> Result<PathBuf, ArchiveError>;
    /// Extract `archive` into `destination` folder and return it.
    fn unpack(&self, archive: &Path, destination: &Path) -> Result<PathBuf, ArchiveError>;
}

#[derive(Debug, Clone, Default)]
pub struct ZipCodec;

impl ZipCodec {
    fn entry_name(relative_path: &Path) -> String {
        relative_path
            .components()
            .map(|component| component.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<String>>()
            .join("/")
    }
}

impl ArchiveCodec for ZipCodec {
    fn pack(&self, directory: &Path, destination: &Path) -> Result<PathBuf, ArchiveError> {
        if !directory.is_dir() {
            return Err(ArchiveError::NotADirectory(directory.to_path_buf()));
        }
        let base_name = directory
            .file_name()
            .ok_or_else(|| ArchiveError::NotADirectory(directory.to_path_buf()))?
            .to_string_lossy()
            .to_string();
        let parent = directory.parent().unwrap_or(directory);
        let archive_path = destination.join(format!("{}{}", base_name, ARCHIVE_EXTENSION));
        log::debug!(
            "Pack {} into {}",
            directory.display(),
            archive_path.display()
        );

        let mut writer = ZipWriter::new(File::create(&archive_path)?);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for entry in WalkDir::new(directory).sort_by_file_name() {
            let entry = entry?;
            let relative_path = entry
                .path()
                .strip_prefix(parent)
                .expect("Walked paths are in the packed directory parent");
            let name = Self::entry_name(relative_path);

            if entry.file_type().is_dir() {
                // Keep empty directories
                writer.add_directory(format!("{}/", name), options)?;
            } else if entry.file_type().is_file() {
                writer.start_file(name, options)?;
                io::copy(&mut File::open(entry.path())?, &mut writer)?;
            }
        }
        writer.finish()?;

        Ok(archive_path)
    }

    fn unpack(&self, archive: &Path, destination: &Path) -> Result<PathBuf, ArchiveError> {
        log::debug!("Unpack {} into {}", archive.display(), destination.display());
        fs::create_dir_all(destination)?;
        let mut reader = ZipArchive::new(File::open(archive)?)?;

        for index in 0..reader.len() {
            let mut file = reader.by_index(index)?;
            let relative_path = file
                .enclosed_name()
                .ok_or_else(|| ArchiveError::UnsafeEntry(file.name().to_string()))?;
            let output_path = destination.join(relative_path);

            if file.is_dir() {
                fs::create_dir_all(&output_path)?;
                continue;
            }
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            io::copy(&mut file, &mut File::create(&output_path)?)?;
        }

        Ok(destination.to_path_buf())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tests::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pack_then_unpack_keeps_tree() {
        let tmpdir_ = tmpdir();
        let world = tmpdir_.join("saves").join("Survival");
        write_files(
            &world,
            &[
                ("level.dat", "level"),
                ("region/r.0.0.mca", "region"),
                ("data/raids.dat", ""),
            ],
        );
        fs::create_dir_all(world.join("datapacks")).unwrap();
        let scratch = tmpdir_.join("scratch");
        fs::create_dir_all(&scratch).unwrap();

        let archive = ZipCodec.pack(&world, &scratch).unwrap();
        let unpacked = ZipCodec.unpack(&archive, &tmpdir_.join("unpacked")).unwrap();

        assert_eq!(archive, scratch.join("Survival.zip"));
        assert_eq!(disk_files(&unpacked), disk_files(&tmpdir_.join("saves")));
        assert!(unpacked.join("Survival").join("datapacks").is_dir());
        assert_eq!(
            fs::read(unpacked.join("Survival/region/r.0.0.mca")).unwrap(),
            b"region".to_vec()
        );
    }

    #[test]
    fn test_pack_missing_directory() {
        let tmpdir_ = tmpdir();

        assert!(matches!(
            ZipCodec.pack(&tmpdir_.join("Survival"), &tmpdir_),
            Err(ArchiveError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_unpack_rejects_escaping_entries() {
        let tmpdir_ = tmpdir();
        let archive_path = tmpdir_.join("evil.zip");
        let mut writer = ZipWriter::new(File::create(&archive_path).unwrap());
        writer
            .start_file("../evil.txt", SimpleFileOptions::default())
            .unwrap();
        io::Write::write_all(&mut writer, b"evil").unwrap();
        writer.finish().unwrap();

        assert!(matches!(
            ZipCodec.unpack(&archive_path, &tmpdir_.join("unpacked")),
            Err(ArchiveError::UnsafeEntry(_))
        ));
        assert!(!tmpdir_.join("evil.txt").exists());
    }
}
