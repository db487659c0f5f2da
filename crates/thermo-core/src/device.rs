// ── Device seam ──
//
// `DeviceConnector` produces handles, `DeviceHandle` reads and moves the
// servo. The HTTP gateway client implements both. Tests substitute fakes.

use std::future::Future;
use std::time::Duration;

use thermo_api::{RobotClient, ServoClient, TransportConfig};
use url::Url;

use crate::config::DialConfig;
use crate::credentials::CredentialPair;

/// Establishes a device session for a credential pair.
pub trait DeviceConnector: Send + Sync + 'static {
    type Handle: DeviceHandle;

    /// Where this connector points. Used in error messages only.
    fn endpoint(&self) -> &str;

    fn connect(
        &self,
        credentials: &CredentialPair,
    ) -> impl Future<Output = Result<Self::Handle, thermo_api::Error>> + Send;
}

/// Servo operations available on a connected device.
pub trait DeviceHandle: Send + Sync + 'static {
    /// Current servo position in degrees.
    fn position(&self) -> impl Future<Output = Result<u32, thermo_api::Error>> + Send;

    /// Move the servo. Resolves once the device has accepted the command.
    fn move_to(&self, angle_deg: u32) -> impl Future<Output = Result<(), thermo_api::Error>> + Send;
}

/// Bound a device call, reporting an elapsed deadline as a timeout error.
pub(crate) async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, thermo_api::Error>>,
) -> Result<T, thermo_api::Error> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| thermo_api::Error::Timeout { timeout: limit })?
}

// ── HTTP gateway implementation ─────────────────────────────────────

/// Connects to the servo through the robot's HTTP gateway.
pub struct RobotConnector {
    endpoint: Url,
    endpoint_display: String,
    component: String,
    transport: TransportConfig,
}

impl RobotConnector {
    pub fn new(config: &DialConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            endpoint_display: config.endpoint.as_str().trim_end_matches('/').to_owned(),
            component: config.component.clone(),
            transport: TransportConfig {
                tls: (&config.tls).into(),
                timeout: config.request_timeout,
            },
        }
    }
}

impl DeviceConnector for RobotConnector {
    type Handle = ServoClient;

    fn endpoint(&self) -> &str {
        &self.endpoint_display
    }

    async fn connect(&self, credentials: &CredentialPair) -> Result<ServoClient, thermo_api::Error> {
        let robot = RobotClient::connect(
            self.endpoint.clone(),
            &credentials.to_api_credential(),
            &self.transport,
        )
        .await?;
        Ok(robot.servo(self.component.clone()))
    }
}

impl DeviceHandle for ServoClient {
    async fn position(&self) -> Result<u32, thermo_api::Error> {
        self.get_position().await
    }

    async fn move_to(&self, angle_deg: u32) -> Result<(), thermo_api::Error> {
        ServoClient::move_to(self, angle_deg).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn bounded_reports_elapsed_deadline() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, thermo_api::Error>(())
        };
        let result = bounded(Duration::from_secs(3), slow).await;
        assert!(matches!(
            result,
            Err(thermo_api::Error::Timeout { timeout }) if timeout == Duration::from_secs(3)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_deadlines_keep_their_precision() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok::<_, thermo_api::Error>(())
        };
        let err = bounded(Duration::from_millis(500), slow).await.unwrap_err();
        assert_eq!(err.to_string(), "Request timed out after 500ms");
    }

    #[tokio::test]
    async fn bounded_passes_results_through() {
        let result = bounded(Duration::from_secs(3), async { Ok::<_, thermo_api::Error>(7) }).await;
        assert!(matches!(result, Ok(7)));
    }
}
