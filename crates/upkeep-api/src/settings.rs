// Settings endpoints
//
// Threshold configuration and notification preferences, plain CRUD.

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::types::SettingsPayload;

impl ApiClient {
    /// Fetch the current threshold and notification settings.
    ///
    /// `GET /settings`
    pub async fn get_settings(&self) -> Result<SettingsPayload, Error> {
        let url = self.endpoint_url("settings")?;
        debug!("fetching settings");
        self.get(url).await
    }

    /// Replace the threshold and notification settings.
    ///
    /// `POST /settings` -- the backend replies with a bare confirmation,
    /// which is discarded.
    pub async fn update_settings(&self, settings: &SettingsPayload) -> Result<(), Error> {
        let url = self.endpoint_url("settings")?;
        debug!("updating settings");
        let _: serde_json::Value = self.post(url, settings).await?;
        Ok(())
    }
}
