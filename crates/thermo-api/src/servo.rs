// Servo component client
//
// Position reads and moves for one named servo. Angles are whole degrees,
// matching the gateway's `position_deg` / `angle_deg` fields.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::robot::{endpoint_url, map_send_error, parse_json, preview};

#[derive(Debug, Deserialize)]
struct PositionResponse {
    position_deg: u32,
}

#[derive(Debug, Serialize)]
struct MoveRequest {
    angle_deg: u32,
}

/// Client for a single servo component on an authenticated robot.
///
/// Obtained from [`RobotClient::servo`](crate::RobotClient::servo).
#[derive(Debug, Clone)]
pub struct ServoClient {
    http: reqwest::Client,
    base_url: Url,
    name: String,
    timeout: Duration,
}

impl ServoClient {
    pub(crate) fn new(http: reqwest::Client, base_url: Url, name: String, timeout: Duration) -> Self {
        Self {
            http,
            base_url,
            name,
            timeout,
        }
    }

    /// Component name on the robot.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the servo's current angle in degrees.
    pub async fn get_position(&self) -> Result<u32, Error> {
        let url = self.component_url("position")?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;
        let resp = self.check_status(resp).await?;

        let body: PositionResponse = parse_json(resp).await?;
        Ok(body.position_deg)
    }

    /// Move the servo to `angle_deg`. Resolves once the gateway accepts the move.
    pub async fn move_to(&self, angle_deg: u32) -> Result<(), Error> {
        let url = self.component_url("move")?;
        debug!(angle_deg, "POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(&MoveRequest { angle_deg })
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;
        let resp = self.check_status(resp).await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                message: preview(&body, "move rejected"),
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    fn component_url(&self, action: &str) -> Result<Url, Error> {
        endpoint_url(
            &self.base_url,
            &format!("v1/components/servo/{}/{action}", self.name),
        )
    }

    /// Map component-level statuses before generic response handling.
    async fn check_status(&self, resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = resp.text().await.unwrap_or_default();
                Err(Error::Authentication {
                    message: preview(&body, "access token rejected"),
                })
            }
            StatusCode::NOT_FOUND => Err(Error::ComponentNotFound {
                name: self.name.clone(),
            }),
            _ => Ok(resp),
        }
    }
}
