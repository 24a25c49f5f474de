use crate::domain::models::Notification;
use crate::domain::timer::SoundCue;
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::{debug, info};

/// Platform capability for local notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn schedule(&self, notification: &Notification) -> Result<(), InfraError>;
    async fn cancel(&self, notification_id: &str) -> Result<(), InfraError>;
}

/// Platform capability for short audible cues.
pub trait SoundPlayer: Send + Sync {
    fn play(&self, cue: SoundCue);
    fn stop(&self, cue: SoundCue);
}

/// Writes notifications to the log instead of a platform notification centre.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn schedule(&self, notification: &Notification) -> Result<(), InfraError> {
        info!(
            id = %notification.id,
            at = %notification.at.to_rfc3339(),
            title = %notification.title,
            body = %notification.body,
            sound = notification.sound.as_deref().unwrap_or("default"),
            urgent = notification.urgent,
            "notification scheduled"
        );
        Ok(())
    }

    async fn cancel(&self, notification_id: &str) -> Result<(), InfraError> {
        info!(id = notification_id, "notification cancelled");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LogSoundPlayer;

impl SoundPlayer for LogSoundPlayer {
    fn play(&self, cue: SoundCue) {
        debug!(cue = cue.as_str(), "play sound");
    }

    fn stop(&self, cue: SoundCue) {
        debug!(cue = cue.as_str(), "stop sound");
    }
}

/// Keeps every request in memory. Can be told to refuse permission.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    scheduled: Mutex<Vec<Notification>>,
    cancelled: Mutex<Vec<String>>,
    permission_denied: bool,
}

impl RecordingNotifier {
    pub fn denying_permission() -> Self {
        Self {
            permission_denied: true,
            ..Self::default()
        }
    }

    pub fn scheduled(&self) -> Vec<Notification> {
        self.scheduled
            .lock()
            .map(|values| values.clone())
            .unwrap_or_default()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled
            .lock()
            .map(|values| values.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn schedule(&self, notification: &Notification) -> Result<(), InfraError> {
        if self.permission_denied {
            return Err(InfraError::NotificationPermissionDenied);
        }
        self.scheduled
            .lock()
            .map_err(|error| InfraError::Notification(format!("notifier lock poisoned: {error}")))?
            .push(notification.clone());
        Ok(())
    }

    async fn cancel(&self, notification_id: &str) -> Result<(), InfraError> {
        self.cancelled
            .lock()
            .map_err(|error| InfraError::Notification(format!("notifier lock poisoned: {error}")))?
            .push(notification_id.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingSoundPlayer {
    played: Mutex<Vec<SoundCue>>,
    stopped: Mutex<Vec<SoundCue>>,
}

impl RecordingSoundPlayer {
    pub fn played(&self) -> Vec<SoundCue> {
        self.played
            .lock()
            .map(|values| values.clone())
            .unwrap_or_default()
    }

    pub fn stopped(&self) -> Vec<SoundCue> {
        self.stopped
            .lock()
            .map(|values| values.clone())
            .unwrap_or_default()
    }
}

impl SoundPlayer for RecordingSoundPlayer {
    fn play(&self, cue: SoundCue) {
        if let Ok(mut played) = self.played.lock() {
            played.push(cue);
        }
    }

    fn stop(&self, cue: SoundCue) {
        if let Ok(mut stopped) = self.stopped.lock() {
            stopped.push(cue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn notification() -> Notification {
        Notification {
            id: "task-1".to_string(),
            title: "Task Due".to_string(),
            body: "Write report".to_string(),
            at: DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
                .expect("valid datetime")
                .with_timezone(&Utc),
            sound: None,
            urgent: false,
        }
    }

    #[tokio::test]
    async fn recording_notifier_keeps_requests() {
        let notifier = RecordingNotifier::default();
        notifier.schedule(&notification()).await.expect("schedule");
        notifier.cancel("task-1").await.expect("cancel");

        assert_eq!(notifier.scheduled(), vec![notification()]);
        assert_eq!(notifier.cancelled(), vec!["task-1".to_string()]);
    }

    #[tokio::test]
    async fn denied_permission_is_reported() {
        let notifier = RecordingNotifier::denying_permission();
        let result = notifier.schedule(&notification()).await;
        assert!(matches!(result, Err(InfraError::NotificationPermissionDenied)));
        assert!(notifier.scheduled().is_empty());
    }

    #[test]
    fn recording_sound_player_tracks_cues() {
        let player = RecordingSoundPlayer::default();
        player.play(SoundCue::TimerTick);
        player.play(SoundCue::TimerComplete);
        player.stop(SoundCue::TimerTick);
        assert_eq!(player.played(), vec![SoundCue::TimerTick, SoundCue::TimerComplete]);
        assert_eq!(player.stopped(), vec![SoundCue::TimerTick]);
    }
}
