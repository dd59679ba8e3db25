use std::{
    fs::File,
    io::{Cursor, Read},
    path::Path,
    time::Duration,
};

use reqwest::{
    blocking::{Body, Response},
    header::CONTENT_TYPE,
    Method,
};
use serde_derive::Deserialize;
use serde_json::json;

use crate::{
    credential::{CredentialStore, OAuthClient},
    types::{ObjectId, ObjectName},
    utils::parse_rfc3339,
};

use super::{ObjectStore, RemoteObject, StoreError};

pub const DRIVE_API_ADDRESS: &str = "https://www.googleapis.com/drive/v3/";
pub const DRIVE_UPLOAD_ADDRESS: &str = "https://www.googleapis.com/upload/drive/v3/";
pub const DEFAULT_CLIENT_TIMEOUT: u64 = 30;
pub const TRANSFER_CLIENT_TIMEOUT: u64 = 3600;
const FILE_FIELDS: &str = "id, name, modifiedTime";
const MULTIPART_BOUNDARY: &str = "savesync-multipart-7d1f5f0a2b9c4e63";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    #[serde(default)]
    modified_time: Option<String>,
}

impl From<DriveFile> for RemoteObject {
    fn from(value: DriveFile) -> Self {
        Self {
            modified: value.modified_time.as_deref().and_then(parse_rfc3339),
            id: ObjectId(value.id),
            name: ObjectName(value.name),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Google Drive (v3 REST api) object store
pub struct DriveStore {
    api_address: String,
    upload_address: String,
    credentials: CredentialStore,
    oauth: Option<OAuthClient>,
    folder: Option<String>,
    client: reqwest::blocking::Client,
    transfer_client: reqwest::blocking::Client,
}

impl DriveStore {
    pub fn new(
        credentials: CredentialStore,
        oauth: Option<OAuthClient>,
        folder: Option<String>,
    ) -> Result<Self, StoreError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_CLIENT_TIMEOUT))
            .build()?;
        let transfer_client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(TRANSFER_CLIENT_TIMEOUT))
            .build()?;
        Ok(Self {
            api_address: DRIVE_API_ADDRESS.to_string(),
            upload_address: DRIVE_UPLOAD_ADDRESS.to_string(),
            credentials,
            oauth,
            folder,
            client,
            transfer_client,
        })
    }

    fn access_token(&self) -> Result<String, StoreError> {
        Ok(self.credentials.access_token(self.oauth.as_ref())?)
    }

    fn query(&self, name: &ObjectName) -> String {
        let mut query = format!("name = '{}' and trashed = false", escape(&name.0));
        if let Some(folder) = &self.folder {
            query.push_str(&format!(" and '{}' in parents", escape(folder)));
        }
        query
    }

    fn list(
        &self,
        name: &ObjectName,
        order_by: Option<&str>,
    ) -> Result<Vec<DriveFile>, StoreError> {
        let mut parameters = vec![
            ("q", self.query(name)),
            ("fields", format!("files({})", FILE_FIELDS)),
            ("pageSize", "1".to_string()),
        ];
        if let Some(order_by) = order_by {
            parameters.push(("orderBy", order_by.to_string()));
        }

        let response = self
            .client
            .request(Method::GET, format!("{}files", self.api_address))
            .bearer_auth(self.access_token()?)
            .query(&parameters)
            .send()?;

        match response.status().as_u16() {
            200 => Ok(response.json::<DriveFileList>()?.files),
            _ => Err(self.response_error(response)),
        }
    }

    fn response_error(&self, response: Response) -> StoreError {
        let status = response.status().as_u16();
        let text = response.text().unwrap_or_default();
        match status {
            401 | 403 => StoreError::AuthenticationError(text),
            404 => StoreError::NotFound(text),
            _ => StoreError::UnexpectedResponse(format!(
                "Response status was {} and response : '{}'",
                status, text
            )),
        }
    }

    // Drive uploads are multipart/related, reqwest multipart::Form only writes form-data
    fn multipart_body(&self, name: &ObjectName, path: &Path) -> Result<Body, StoreError> {
        let mut metadata = json!({
            "name": name.0,
            "mimeType": "application/octet-stream",
        });
        if let Some(folder) = &self.folder {
            metadata["parents"] = json!([folder]);
        }

        let file = File::open(path)
            .map_err(|error| StoreError::FileError(path.to_path_buf(), error.to_string()))?;
        let file_len = file
            .metadata()
            .map_err(|error| StoreError::FileError(path.to_path_buf(), error.to_string()))?
            .len();
        let head = format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n--{boundary}\r\nContent-Type: application/octet-stream\r\n\r\n",
            boundary = MULTIPART_BOUNDARY,
            metadata = metadata,
        )
        .into_bytes();
        let tail = format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).into_bytes();
        let len = head.len() as u64 + file_len + tail.len() as u64;

        Ok(Body::sized(
            Cursor::new(head).chain(file).chain(Cursor::new(tail)),
            len,
        ))
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

impl ObjectStore for DriveStore {
    fn create(&self, name: &ObjectName, path: &Path) -> Result<RemoteObject, StoreError> {
        log::debug!("Upload {} as '{}'", path.display(), name);
        let body = self.multipart_body(name, path)?;
        let response = self
            .transfer_client
            .request(Method::POST, format!("{}files", self.upload_address))
            .bearer_auth(self.access_token()?)
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(body)
            .send()?;

        match response.status().as_u16() {
            200 => Ok(response.json::<DriveFile>()?.into()),
            _ => Err(self.response_error(response)),
        }
    }

    fn find_by_name(&self, name: &ObjectName) -> Result<Option<RemoteObject>, StoreError> {
        Ok(self
            .list(name, None)?
            .into_iter()
            .next()
            .map(RemoteObject::from))
    }

    fn download(&self, id: &ObjectId, destination: &Path) -> Result<(), StoreError> {
        log::debug!("Download object {} into {}", id, destination.display());
        let mut response = self
            .transfer_client
            .request(Method::GET, format!("{}files/{}", self.api_address, id))
            .bearer_auth(self.access_token()?)
            .query(&[("alt", "media")])
            .send()?;

        match response.status().as_u16() {
            200 => {
                let mut file = File::create(destination).map_err(|error| {
                    StoreError::FileError(destination.to_path_buf(), error.to_string())
                })?;
                response.copy_to(&mut file)?;
                Ok(())
            }
            _ => Err(self.response_error(response)),
        }
    }

    fn delete(&self, id: &ObjectId) -> Result<(), StoreError> {
        log::debug!("Delete object {}", id);
        let response = self
            .client
            .request(Method::DELETE, format!("{}files/{}", self.api_address, id))
            .bearer_auth(self.access_token()?)
            .send()?;

        match response.status().as_u16() {
            200 | 204 => Ok(()),
            _ => Err(self.response_error(response)),
        }
    }

    fn latest_by_name(&self, name: &ObjectName) -> Result<Option<RemoteObject>, StoreError> {
        Ok(self
            .list(name, Some("modifiedTime desc"))?
            .into_iter()
            .next()
            .map(RemoteObject::from))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use testdir::testdir;

    fn store(folder: Option<&str>) -> DriveStore {
        DriveStore::new(
            CredentialStore::new(testdir!().join("token.json")),
            None,
            folder.map(|value| value.to_string()),
        )
        .unwrap()
    }

    #[test]
    fn test_query() {
        assert_eq!(
            store(None).query(&ObjectName::from("Survival.zip")),
            "name = 'Survival.zip' and trashed = false".to_string()
        );
        assert_eq!(
            store(Some("1AbC")).query(&ObjectName::from("Bob's world.zip")),
            "name = 'Bob\\'s world.zip' and trashed = false and '1AbC' in parents".to_string()
        );
    }

    #[test]
    fn test_file_list_into_remote_objects() {
        let list: DriveFileList = serde_json::from_str(
            r#"{"files": [{"id": "1xYz", "name": "Survival.zip", "modifiedTime": "2024-01-03T00:00:00.000Z"}]}"#,
        )
        .unwrap();

        let objects: Vec<RemoteObject> = list.files.into_iter().map(RemoteObject::from).collect();

        assert_eq!(
            objects,
            vec![RemoteObject {
                id: ObjectId("1xYz".to_string()),
                name: ObjectName::from("Survival.zip"),
                modified: Some(Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()),
            }]
        );
    }

    #[test]
    fn test_empty_file_list() {
        let list: DriveFileList = serde_json::from_str("{}").unwrap();
        assert!(list.files.is_empty());
    }

    #[test]
    fn test_requests_without_token_are_authentication_errors() {
        assert!(matches!(
            store(None).find_by_name(&ObjectName::from("Survival.zip")),
            Err(StoreError::AuthenticationError(_))
        ));
    }

    #[test]
    fn test_multipart_body_of_missing_file() {
        assert!(matches!(
            store(None).multipart_body(&ObjectName::from("Survival.zip"), &testdir!().join("nope")),
            Err(StoreError::FileError(_, _))
        ));
    }
}
