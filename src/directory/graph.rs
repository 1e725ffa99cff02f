use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{Directory, UserProfile};
use crate::error::{Error, Result};

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

const GROUP_ODATA_TYPE: &str = "#microsoft.graph.group";
const MAX_PAGES: usize = 1000;

/// Microsoft Graph compatible directory, authenticated with a caller-supplied
/// bearer token.
pub struct GraphDirectory {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct DirectoryObject {
    #[serde(rename = "@odata.type", default)]
    odata_type: Option<String>,
    id: String,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink", default)]
    next_link: Option<String>,
}

impl GraphDirectory {
    pub fn new(client: reqwest::Client, base_url: &str, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn user_url(&self, user_id: &str) -> String {
        format!("{}/users/{}", self.base_url, urlencoding::encode(user_id))
    }

    /// Continuation links carry the bearer token, so they must point back at
    /// the configured directory.
    fn same_origin(&self, link: String) -> Result<String> {
        let base = reqwest::Url::parse(&self.base_url)
            .map_err(|e| Error::Directory(format!("invalid directory url: {e}")))?;
        let next = reqwest::Url::parse(&link)
            .map_err(|e| Error::Directory(format!("invalid continuation link {link}: {e}")))?;
        if next.origin() != base.origin() {
            return Err(Error::Directory(format!(
                "continuation link {link} leaves the directory origin"
            )));
        }
        Ok(link)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Directory(format!(
                "directory returned {} for {url}",
                status.as_u16()
            )));
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl Directory for GraphDirectory {
    async fn resolve_groups(&self, user_id: &str) -> Result<HashSet<String>> {
        let mut groups = HashSet::new();
        let mut next = Some(format!(
            "{}/memberOf?$select=id,displayName",
            self.user_url(user_id)
        ));
        let mut pages = 0;

        while let Some(url) = next {
            pages += 1;
            if pages > MAX_PAGES {
                return Err(Error::Directory(format!(
                    "group listing for {user_id} exceeded {MAX_PAGES} pages"
                )));
            }

            let page: Page<DirectoryObject> = self.get_json(&url).await?;
            groups.extend(
                page.value
                    .into_iter()
                    .filter(|o| o.odata_type.as_deref().is_none_or(|t| t == GROUP_ODATA_TYPE))
                    .map(|o| o.id),
            );
            next = match page.next_link {
                Some(link) => Some(self.same_origin(link)?),
                None => None,
            };
        }

        Ok(groups)
    }

    async fn resolve_profile(&self, user_id: &str) -> Result<UserProfile> {
        let url = format!(
            "{}?$select=id,displayName,mail,userPrincipalName,jobTitle",
            self.user_url(user_id)
        );
        self.get_json(&url).await
    }
}
