use async_trait::async_trait;
use serde_json::json;

use reluxe_shared::clients::proxy::ProxyClient;
use reluxe_shared::errors::AppResult;

use crate::follow::SocialApi;

#[derive(Debug, Clone)]
pub struct HttpSocialApi {
    client: ProxyClient,
}

impl HttpSocialApi {
    pub fn new(client: ProxyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SocialApi for HttpSocialApi {
    async fn set_following(&self, designer: &str, follow: bool) -> AppResult<()> {
        let body = json!({
            "designer": designer,
            "follow": follow,
        });
        // The backend answers with an empty success envelope.
        let _: Vec<serde_json::Value> = self.client.post("designer", &body).await?;
        Ok(())
    }

    async fn guide_keyword(&self, keyword: &str) -> AppResult<Vec<String>> {
        let uri = format!("search/guideKeyword?keyword={keyword}");
        self.client.get(&uri).await
    }
}
