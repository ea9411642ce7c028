//! Best-effort achievement notifier
//!
//! Talks to the external achievement service after a user's first
//! comment lands. Everything here is fire-and-forget: failures are
//! logged and swallowed, never surfaced to the request path.

use crate::config::AchievementConfig;
use crate::errors::{AppError, Result};
use backoff::{future::retry, ExponentialBackoff};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct UserAchievements {
    #[serde(default)]
    achievement: Vec<AchievementRef>,
}

#[derive(Debug, Deserialize)]
struct AchievementRef {
    id: i64,
}

/// Client for the achievement service
#[derive(Clone)]
pub struct AchievementNotifier {
    client: reqwest::Client,
    api_url: String,
    give_token: String,
    first_comment_achievement_id: i64,
}

impl AchievementNotifier {
    /// Build a notifier from config; `None` means the integration is disabled
    pub fn from_config(config: &AchievementConfig) -> Result<Option<Self>> {
        let (Some(api_url), Some(give_token), Some(achievement_id)) = (
            config.api_url.clone(),
            config.give_token.clone(),
            config.first_comment_achievement_id,
        ) else {
            info!("Achievement notifier disabled: integration not configured");
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to build achievement HTTP client: {}", e),
            })?;

        Ok(Some(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            give_token,
            first_comment_achievement_id: achievement_id,
        }))
    }

    /// Award the first-comment achievement unless the user already has it.
    ///
    /// Meant to run in a spawned task after the comment transaction has
    /// committed; all errors end here.
    pub async fn award_first_comment(&self, user_id: i64) {
        if let Err(e) = self.try_award_first_comment(user_id).await {
            warn!(user_id, error = %e, "Failed to award first-comment achievement");
        }
    }

    async fn try_award_first_comment(&self, user_id: i64) -> Result<()> {
        let owned = self.user_achievements(user_id).await?;
        if owned
            .achievement
            .iter()
            .any(|a| a.id == self.first_comment_achievement_id)
        {
            debug!(user_id, "User already has the first-comment achievement");
            return Ok(());
        }

        let url = format!(
            "{}/achievement/achievement/{}/reciever/{}",
            self.api_url, self.first_comment_achievement_id, user_id
        );

        let policy = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(policy, || async {
            let response = self
                .client
                .post(&url)
                .header("Accept", "application/json")
                .header("Authorization", &self.give_token)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(AppError::from(e)))?;

            let status = response.status();
            if status.is_server_error() {
                return Err(backoff::Error::transient(AppError::Internal {
                    message: format!("Achievement service returned {}", status),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(AppError::Internal {
                    message: format!("Achievement service returned {}", status),
                }));
            }
            Ok(())
        })
        .await?;

        info!(user_id, "Awarded first-comment achievement");
        Ok(())
    }

    async fn user_achievements(&self, user_id: i64) -> Result<UserAchievements> {
        let url = format!("{}/achievement/user/{}", self.api_url, user_id);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Internal {
                message: format!("Achievement lookup returned {}", status),
            });
        }

        response.json::<UserAchievements>().await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_without_configuration() {
        let config = AchievementConfig {
            api_url: None,
            give_token: None,
            first_comment_achievement_id: None,
            timeout_secs: 5,
        };
        assert!(AchievementNotifier::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_trailing_slash_is_normalized() {
        let config = AchievementConfig {
            api_url: Some("https://achievements.example/".into()),
            give_token: Some("token".into()),
            first_comment_achievement_id: Some(17),
            timeout_secs: 5,
        };
        let notifier = AchievementNotifier::from_config(&config)
            .unwrap()
            .expect("configured notifier");
        assert_eq!(notifier.api_url, "https://achievements.example");
    }

    #[test]
    fn test_achievement_payload_parsing() {
        let raw = r#"{"achievement": [{"id": 17, "name": "First comment"}]}"#;
        let parsed: UserAchievements = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.achievement.len(), 1);
        assert_eq!(parsed.achievement[0].id, 17);

        let empty: UserAchievements = serde_json::from_str("{}").unwrap();
        assert!(empty.achievement.is_empty());
    }
}
