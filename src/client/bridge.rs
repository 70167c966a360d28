//! HTTP implementation of [`ChatClient`] talking to the protocol bridge.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::{ChatClient, ClientError, GroupInfo, MessageRef, OutgoingMessage, ThreadType, UserInfo};

/// Client for the bridge's REST surface.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl BridgeClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ClientError> {
        let mut base = Url::parse(base_url)?;
        // Url::join drops the last segment unless the path ends with '/'
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self { http, base, token })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ClientError> {
        let url = self.endpoint(path)?;
        debug!("bridge POST {}", url);
        let resp = self.authorize(self.http.post(url).json(body)).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::Rejected {
                endpoint: path.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        debug!("bridge GET {}", url);
        let resp = self.authorize(self.http.get(url)).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::Rejected {
                endpoint: path.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl ChatClient for BridgeClient {
    async fn send_message(
        &self,
        message: OutgoingMessage,
        thread_id: &str,
        thread_type: ThreadType,
    ) -> Result<(), ClientError> {
        self.post(
            "send",
            &json!({ "message": message, "threadId": thread_id, "type": thread_type }),
        )
        .await
    }

    async fn delete_message(&self, message: &MessageRef, is_self: bool) -> Result<(), ClientError> {
        self.post("delete", &json!({ "message": message, "onlyMe": is_self }))
            .await
    }

    async fn block_users(&self, thread_id: &str, user_ids: &[String]) -> Result<(), ClientError> {
        self.post("block", &json!({ "threadId": thread_id, "userIds": user_ids }))
            .await
    }

    async fn remove_user_from_group(&self, thread_id: &str, user_id: &str) -> Result<(), ClientError> {
        self.post("remove", &json!({ "threadId": thread_id, "userId": user_id }))
            .await
    }

    async fn add_reaction(&self, icon: &str, message: &MessageRef) -> Result<(), ClientError> {
        self.post("reaction", &json!({ "icon": icon, "message": message }))
            .await
    }

    async fn get_group_info(&self, thread_id: &str) -> Result<GroupInfo, ClientError> {
        self.get(&format!("group/{}", thread_id)).await
    }

    async fn get_user_info(&self, user_id: &str) -> Result<UserInfo, ClientError> {
        self.get(&format!("user/{}", user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = BridgeClient::new("http://localhost:3000/api", None).unwrap();
        assert_eq!(
            client.endpoint("send").unwrap().as_str(),
            "http://localhost:3000/api/send"
        );
        assert_eq!(
            client.endpoint("group/g1").unwrap().as_str(),
            "http://localhost:3000/api/group/g1"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            BridgeClient::new("not a url", None),
            Err(ClientError::Url(_))
        ));
    }
}
