// Device endpoints
//
// Read-only device inventory: listing with latest sensor snapshots, and
// single-device lookup.

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::types::DeviceRecord;

impl ApiClient {
    /// List all monitored devices with their latest sensor snapshots.
    ///
    /// `GET /devices`
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>, Error> {
        let url = self.endpoint_url("devices")?;
        debug!("listing devices");
        self.get_list(url).await
    }

    /// Get a single device by id.
    ///
    /// `GET /devices/{id}` -- the backend returns 404 for unknown ids,
    /// surfaced as `Error::Status`.
    pub async fn get_device(&self, id: &str) -> Result<DeviceRecord, Error> {
        let url = self.endpoint_url(&format!("devices/{id}"))?;
        debug!(id, "fetching device");
        self.get(url).await
    }
}
