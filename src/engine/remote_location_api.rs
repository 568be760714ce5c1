use super::Engine;

use async_trait::async_trait;

use crate::{api::RemoteLocationAPI, entities::RemoteLocation, error::Error};

#[async_trait]
impl RemoteLocationAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn list_remote_locations(&self) -> Result<Vec<RemoteLocation>, Error> {
        match &self.remote {
            Some(remote) => Ok(remote.fetch_all().await),
            None => Ok(Vec::new()),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn delete_remote_location(&self, remote_id: String) -> Result<bool, Error> {
        match &self.remote {
            Some(remote) => Ok(remote.mirror_delete(&remote_id).await),
            None => Ok(false),
        }
    }
}
